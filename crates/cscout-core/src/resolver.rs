//! Resolve aggregator links to course-platform links, one page at a time.

use std::time::Duration;

use tracing::{info, warn};

use crate::{
    domain::{AnchorMode, PageVisit},
    errors::Error,
    ports::PageNavigator,
    Result,
};

#[derive(Clone, Debug)]
pub struct ResolveOptions {
    pub target_prefix: String,
    pub anchor_mode: AnchorMode,
    /// Per-page deadline on top of whatever the navigator enforces. `None` is unbounded.
    pub timeout: Option<Duration>,
}

/// Visit every link in order, skipping failures, and return the distinct
/// target URLs in first-discovery order.
pub async fn resolve_links(
    navigator: &dyn PageNavigator,
    links: &[String],
    opts: &ResolveOptions,
) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::new();

    for link in links {
        info!(url = %link, "Visiting aggregator page");
        match resolve_one(navigator, link, opts).await {
            Ok(found) => {
                for target in found {
                    if resolved.contains(&target) {
                        continue;
                    }
                    info!(url = %link, target = %target, "Resolved course link");
                    resolved.push(target);
                }
            }
            Err(Error::BotDetected(_)) => {
                warn!(url = %link, "Bot-detection page, skipping");
            }
            Err(Error::NoTargetLink(_)) => {
                info!(url = %link, "No course link on page");
            }
            Err(e) => {
                warn!(url = %link, error = %e, "Failed to resolve link");
            }
        }
    }

    navigator.shutdown().await;
    info!(
        visited = links.len(),
        resolved = resolved.len(),
        "Resolved aggregator links"
    );
    resolved
}

async fn resolve_one(
    navigator: &dyn PageNavigator,
    link: &str,
    opts: &ResolveOptions,
) -> Result<Vec<String>> {
    let visit = match opts.timeout {
        Some(limit) => tokio::time::timeout(limit, navigator.visit(link, &opts.target_prefix))
            .await
            .map_err(|_| Error::Timeout(link.to_string()))??,
        None => navigator.visit(link, &opts.target_prefix).await?,
    };
    select_targets(link, visit, opts)
}

fn select_targets(link: &str, visit: PageVisit, opts: &ResolveOptions) -> Result<Vec<String>> {
    if visit.final_url.to_lowercase().contains("captcha") {
        return Err(Error::BotDetected(link.to_string()));
    }

    let mut hrefs = visit
        .hrefs
        .into_iter()
        .filter(|h| h.starts_with(&opts.target_prefix));
    let picked: Vec<String> = match opts.anchor_mode {
        AnchorMode::First => hrefs.next().into_iter().collect(),
        AnchorMode::All => hrefs.collect(),
    };

    if picked.is_empty() {
        return Err(Error::NoTargetLink(link.to_string()));
    }
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{collections::HashMap, sync::Mutex};

    const PREFIX: &str = "https://www.udemy.com/course/";

    enum Page {
        Hang,
        Fail,
        Visit(PageVisit),
    }

    #[derive(Default)]
    struct FakeNavigator {
        pages: HashMap<String, Page>,
        visited: Mutex<Vec<String>>,
        shutdowns: Mutex<usize>,
    }

    impl FakeNavigator {
        fn page(mut self, url: &str, page: Page) -> Self {
            self.pages.insert(url.to_string(), page);
            self
        }
    }

    #[async_trait]
    impl PageNavigator for FakeNavigator {
        async fn visit(&self, url: &str, _href_prefix: &str) -> Result<PageVisit> {
            self.visited.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Page::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("timeout should fire first")
                }
                Some(Page::Fail) | None => Err(Error::Navigation {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
                Some(Page::Visit(v)) => Ok(v.clone()),
            }
        }

        async fn shutdown(&self) {
            *self.shutdowns.lock().unwrap() += 1;
        }
    }

    fn visit(url: &str, hrefs: &[&str]) -> Page {
        Page::Visit(PageVisit {
            final_url: url.to_string(),
            hrefs: hrefs.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn opts(mode: AnchorMode) -> ResolveOptions {
        ResolveOptions {
            target_prefix: PREFIX.to_string(),
            anchor_mode: mode,
            timeout: Some(Duration::from_millis(50)),
        }
    }

    fn links(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn timeout_on_one_page_does_not_abort_batch() {
        let nav = FakeNavigator::default()
            .page("https://coursefolder.net/slow", Page::Hang)
            .page(
                "https://coursefolder.net/ok",
                visit(
                    "https://coursefolder.net/ok",
                    &["https://www.udemy.com/course/rust/?couponCode=FREE"],
                ),
            );

        let out = resolve_links(
            &nav,
            &links(&["https://coursefolder.net/slow", "https://coursefolder.net/ok"]),
            &opts(AnchorMode::First),
        )
        .await;

        assert_eq!(
            out,
            vec!["https://www.udemy.com/course/rust/?couponCode=FREE".to_string()]
        );
        assert_eq!(nav.visited.lock().unwrap().len(), 2);
        assert_eq!(*nav.shutdowns.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn failures_captcha_and_missing_anchor_are_skipped() {
        let nav = FakeNavigator::default()
            .page("https://coursefolder.net/err", Page::Fail)
            .page(
                "https://coursefolder.net/bot",
                visit(
                    "https://coursefolder.net/Captcha?return=/bot",
                    &["https://www.udemy.com/course/hidden/"],
                ),
            )
            .page(
                "https://coursefolder.net/empty",
                visit("https://coursefolder.net/empty", &[]),
            )
            .page(
                "https://coursefolder.net/good",
                visit(
                    "https://coursefolder.net/good",
                    &["https://www.udemy.com/course/go/"],
                ),
            );

        let out = resolve_links(
            &nav,
            &links(&[
                "https://coursefolder.net/err",
                "https://coursefolder.net/bot",
                "https://coursefolder.net/empty",
                "https://coursefolder.net/good",
            ]),
            &opts(AnchorMode::First),
        )
        .await;
        assert_eq!(out, vec!["https://www.udemy.com/course/go/".to_string()]);
    }

    #[tokio::test]
    async fn same_target_on_several_pages_is_kept_once() {
        let nav = FakeNavigator::default()
            .page(
                "https://coursefolder.net/a",
                visit(
                    "https://coursefolder.net/a",
                    &[
                        "https://www.udemy.com/course/shared/",
                        "https://www.udemy.com/course/only-a/",
                    ],
                ),
            )
            .page(
                "https://coursefolder.net/b",
                visit(
                    "https://coursefolder.net/b",
                    &[
                        "https://www.udemy.com/course/only-b/",
                        "https://www.udemy.com/course/shared/",
                    ],
                ),
            );
        let input = links(&["https://coursefolder.net/a", "https://coursefolder.net/b"]);

        let first = resolve_links(&nav, &input, &opts(AnchorMode::First)).await;
        assert_eq!(
            first,
            vec![
                "https://www.udemy.com/course/shared/".to_string(),
                "https://www.udemy.com/course/only-b/".to_string(),
            ]
        );

        let all = resolve_links(&nav, &input, &opts(AnchorMode::All)).await;
        assert_eq!(
            all,
            vec![
                "https://www.udemy.com/course/shared/".to_string(),
                "https://www.udemy.com/course/only-a/".to_string(),
                "https://www.udemy.com/course/only-b/".to_string(),
            ]
        );
    }

    #[test]
    fn hrefs_outside_prefix_are_ignored() {
        let v = PageVisit {
            final_url: "https://coursefolder.net/x".to_string(),
            hrefs: vec!["https://www.udemy.com/user/someone/".to_string()],
        };
        let err = select_targets("https://coursefolder.net/x", v, &opts(AnchorMode::All))
            .unwrap_err();
        assert!(matches!(err, Error::NoTargetLink(_)));
    }
}

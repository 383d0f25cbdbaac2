//! Notification bodies and message chunking.

/// Short site name from a URL or host: `https://www.udemy.com/course/` → `udemy`.
pub fn site_name(url_or_host: &str) -> String {
    let host = url::Url::parse(url_or_host)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| {
            url_or_host
                .split('/')
                .find(|s| !s.is_empty() && !s.ends_with(':'))
                .unwrap_or(url_or_host)
                .to_string()
        });
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host.split('.').next().unwrap_or(host).to_lowercase()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn no_new_links_message(link_marker: &str) -> String {
    format!("🚫 No new {} links found today.", site_name(link_marker))
}

pub fn no_resolved_links_message(target_prefix: &str) -> String {
    format!(
        "⚠️ No {} links extracted today.",
        capitalize(&site_name(target_prefix))
    )
}

pub fn courses_report(target_prefix: &str, links: &[String]) -> String {
    format!(
        "🎓 Today's {} Courses:\n\n{}",
        capitalize(&site_name(target_prefix)),
        links.join("\n")
    )
}

/// Split `text` for delivery. Bodies up to `split_threshold` chars go out
/// whole; longer ones are cut at line boundaries into chunks of at most
/// `chunk_len` chars. A single line longer than `chunk_len` is cut on char
/// boundaries. Concatenating the chunks gives back `text`.
pub fn split_message(text: &str, split_threshold: usize, chunk_len: usize) -> Vec<String> {
    if text.chars().count() <= split_threshold {
        return vec![text.to_string()];
    }
    let chunk_len = chunk_len.max(1);

    let mut parts: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if cur_len + line_len > chunk_len && !cur.is_empty() {
            parts.push(std::mem::take(&mut cur));
            cur_len = 0;
        }

        if line_len > chunk_len {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(chunk_len) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == chunk_len {
                    parts.push(piece);
                } else {
                    cur_len = piece.chars().count();
                    cur = piece;
                }
            }
            continue;
        }

        cur.push_str(line);
        cur_len += line_len;
    }

    if !cur.is_empty() {
        parts.push(cur);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_names() {
        assert_eq!(site_name("coursefolder.net"), "coursefolder");
        assert_eq!(site_name("https://www.udemy.com/course/"), "udemy");
        assert_eq!(site_name("www.example.org/path"), "example");
    }

    #[test]
    fn notice_bodies() {
        assert_eq!(
            no_new_links_message("coursefolder.net"),
            "🚫 No new coursefolder links found today."
        );
        assert_eq!(
            no_resolved_links_message("https://www.udemy.com/course/"),
            "⚠️ No Udemy links extracted today."
        );
        assert_eq!(
            courses_report(
                "https://www.udemy.com/course/",
                &["a".to_string(), "b".to_string()]
            ),
            "🎓 Today's Udemy Courses:\n\na\nb"
        );
    }

    #[test]
    fn short_text_is_one_chunk() {
        let text = "🎓 Today's Udemy Courses:\n\nhttps://www.udemy.com/course/x/";
        assert_eq!(split_message(text, 4000, 3500), vec![text.to_string()]);
    }

    #[test]
    fn long_text_is_split_on_lines_within_limit() {
        let links: Vec<String> = (0..200)
            .map(|i| format!("https://www.udemy.com/course/some-course-{i:03}/?couponCode=ABC"))
            .collect();
        let text = courses_report("https://www.udemy.com/course/", &links);
        assert!(text.chars().count() > 4000);

        let parts = split_message(&text, 4000, 3500);
        assert!(parts.len() > 1);
        assert!(parts.iter().all(|p| p.chars().count() <= 3500));
        assert_eq!(parts.concat(), text);
        // No link is cut in half.
        for p in &parts {
            for line in p.lines() {
                assert!(line.is_empty() || line.starts_with("https://") || line.starts_with("🎓"));
            }
        }
    }

    #[test]
    fn overlong_line_is_hard_split() {
        let text = format!("head\n{}\ntail", "x".repeat(25));
        let parts = split_message(&text, 10, 10);
        assert!(parts.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(parts.concat(), text);
    }
}

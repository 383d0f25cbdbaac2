//! Channel reader over MTProto (grammers), logged in as a user account.
//!
//! The session comes from `TG_SESSION` (base64) when set, else from a session
//! file. An unauthorized session triggers an interactive login when `TG_PHONE`
//! is set; the login code is read from stdin.

use async_trait::async_trait;
use data_encoding::BASE64;
use grammers_client::{types::Message, Client, Config as ClientConfig, InitParams, SignInError};
use grammers_session::Session;
use grammers_tl_types as tl;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use cscout_core::{
    config::MtprotoCredentials,
    domain::{ChannelMessage, LinkEntity, MessageId},
    errors::Error,
    ports::ChannelSource,
    Result,
};

pub struct MtprotoSource {
    creds: MtprotoCredentials,
    client: Option<Client>,
}

impl MtprotoSource {
    pub fn new(creds: MtprotoCredentials) -> Self {
        Self {
            creds,
            client: None,
        }
    }

    fn load_session(&self) -> Result<Session> {
        if let Some(encoded) = &self.creds.session {
            let bytes = BASE64
                .decode(encoded.as_bytes())
                .map_err(|e| Error::Config(format!("TG_SESSION is not valid base64: {e}")))?;
            return Session::load(&bytes)
                .map_err(|e| Error::Config(format!("TG_SESSION is not a valid session: {e}")));
        }
        Ok(Session::load_file_or_create(&self.creds.session_file)?)
    }

    async fn connect(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        info!("Connecting to Telegram");
        let client = Client::connect(ClientConfig {
            session: self.load_session()?,
            api_id: self.creds.api_id,
            api_hash: self.creds.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| Error::Channel(format!("connect failed: {e}")))?;

        let authorized = client
            .is_authorized()
            .await
            .map_err(|e| Error::Channel(format!("authorization check failed: {e}")))?;
        if !authorized {
            self.sign_in(&client).await?;
        }

        self.client = Some(client.clone());
        Ok(client)
    }

    async fn sign_in(&self, client: &Client) -> Result<()> {
        let Some(phone) = &self.creds.phone else {
            return Err(Error::Channel(
                "session is not authorized; set TG_SESSION, or TG_PHONE for an interactive login"
                    .to_string(),
            ));
        };

        let token = client
            .request_login_code(phone)
            .await
            .map_err(|e| Error::Channel(format!("login code request failed: {e}")))?;
        let code = prompt("Enter the login code Telegram sent you: ").await?;

        match client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompt("Two-step verification password: ").await?;
                client
                    .check_password(password_token, password)
                    .await
                    .map_err(|e| Error::Channel(format!("password check failed: {e}")))?;
            }
            Err(e) => return Err(Error::Channel(format!("sign-in failed: {e}"))),
        }
        info!("Signed in to Telegram");

        self.persist_session(client);
        if self.creds.session.is_none() {
            let encoded = BASE64.encode(&client.session().save());
            println!("TG_SESSION={encoded}");
        }
        Ok(())
    }

    fn persist_session(&self, client: &Client) {
        if self.creds.session.is_some() {
            return;
        }
        if let Err(e) = client.session().save_to_file(&self.creds.session_file) {
            warn!(path = %self.creds.session_file.display(), error = %e, "Failed to save session");
        }
    }
}

#[async_trait]
impl ChannelSource for MtprotoSource {
    async fn read_recent(
        &mut self,
        channel: &str,
        limit: usize,
        on_message: &mut (dyn FnMut(ChannelMessage) + Send),
    ) -> Result<()> {
        let client = self.connect().await?;
        let username = channel.trim().trim_start_matches('@');

        let chat = client
            .resolve_username(username)
            .await
            .map_err(|e| Error::Channel(format!("resolve {channel} failed: {e}")))?
            .ok_or_else(|| Error::Channel(format!("channel not found: {channel}")))?;

        let mut messages = client.iter_messages(chat.pack()).limit(limit);
        let mut delivered = 0usize;
        while let Some(message) = messages
            .next()
            .await
            .map_err(|e| Error::Channel(format!("message iteration failed: {e}")))?
        {
            on_message(to_channel_message(&message));
            delivered += 1;
        }

        debug!(channel, delivered, "Read channel history");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            self.persist_session(&client);
        }
    }
}

fn to_channel_message(message: &Message) -> ChannelMessage {
    ChannelMessage {
        id: MessageId(i64::from(message.id())),
        text: message.text().to_string(),
        entities: message
            .fmt_entities()
            .map(|ents| link_entities(ents))
            .unwrap_or_default(),
    }
}

fn link_entities(entities: &[tl::enums::MessageEntity]) -> Vec<LinkEntity> {
    let span = |offset: i32, length: i32| {
        (
            usize::try_from(offset).unwrap_or(0),
            usize::try_from(length).unwrap_or(0),
        )
    };

    entities
        .iter()
        .filter_map(|ent| match ent {
            tl::enums::MessageEntity::Url(u) => {
                let (offset, length) = span(u.offset, u.length);
                Some(LinkEntity::Url { offset, length })
            }
            tl::enums::MessageEntity::TextUrl(u) => {
                let (offset, length) = span(u.offset, u.length);
                Some(LinkEntity::TextUrl {
                    offset,
                    length,
                    url: u.url.clone(),
                })
            }
            _ => None,
        })
        .collect()
}

async fn prompt(question: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim().to_string())
}

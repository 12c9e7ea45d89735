//! Digest delivery: mode selection, message construction, SMTP submission.

use crate::config::{Config, DeliveryMode};
use crate::consts::{headers, limits, mail};
use chrono::{Local, NaiveDate};
use lettre::address::Address;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Code;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("{relay} rejected the login [{}]: {detail}", code_label(.code))]
    Auth { relay: &'static str, code: Option<u16>, detail: String },
    #[error("could not provision a test inbox: {0}")]
    Provision(String),
    #[error("invalid mail address '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("could not build the message: {0}")]
    Build(String),
    #[error("send failed [{}]: {detail}", code_label(.code))]
    Send { code: Option<u16>, detail: String },
}

fn code_label(code: &Option<u16>) -> String {
    code.map(|c| format!("SMTP {}", c)).unwrap_or_else(|| "no code".to_string())
}

impl DeliveryError {
    /// Steps for the operator when Gmail refuses the credential
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            DeliveryError::Auth { relay, .. } if *relay == mail::GMAIL_HOST => &[
                "If the account has 2-Step Verification, an App Password is required.",
                "1) Visit https://myaccount.google.com/security",
                "2) Enable 2-Step Verification",
                "3) Create an App Password for 'Mail'",
                "4) Put it in your .env as EMAIL_PASS=xxxx xxxx xxxx xxxx",
                "Or set USE_ETHEREAL=true in .env to test without Gmail.",
            ],
            _ => &[],
        }
    }
}

/// Map an SMTP failure to a delivery error. Reply codes decide first; the
/// text patterns only cover servers that report auth problems with odd codes.
pub fn classify_smtp_failure(relay: Relay, code: Option<u16>, detail: &str) -> DeliveryError {
    static AUTH_TEXT: OnceLock<Regex> = OnceLock::new();
    let by_code = matches!(code, Some(530 | 534 | 535));
    let by_text = AUTH_TEXT
        .get_or_init(|| {
            Regex::new(
                r"(?i)application-specific password required|username and password not accepted|authentication (failed|required|credentials invalid)",
            )
            .expect("static regex")
        })
        .is_match(detail);

    if by_code || by_text {
        DeliveryError::Auth { relay: relay.host, code, detail: detail.to_string() }
    } else {
        DeliveryError::Send { code, detail: detail.to_string() }
    }
}

/// What the server said after accepting the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub code: u16,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpFailure {
    pub code: Option<u16>,
    pub detail: String,
}

/// Throwaway credentials for the disposable inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAccount {
    pub user: String,
    pub pass: String,
    pub web: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relay {
    pub host: &'static str,
    pub port: u16,
}

impl Relay {
    pub const GMAIL: Relay = Relay { host: mail::GMAIL_HOST, port: mail::SUBMISSION_PORT };
    pub const ETHEREAL: Relay = Relay { host: mail::ETHEREAL_HOST, port: mail::SUBMISSION_PORT };
}

pub trait MailTransport {
    async fn submit(&self, message: Message) -> Result<Receipt, SmtpFailure>;
}

/// Builds transports and provisions test inboxes
pub trait TransportProvider {
    type Transport: MailTransport;

    async fn provision_test_account(&self) -> Result<TestAccount, DeliveryError>;

    fn connect(&self, relay: Relay, user: &str, pass: &str) -> Result<Self::Transport, DeliveryError>;
}

// ═══════════════════════════════════════════════════════════════════
// LETTRE / ETHEREAL
// ═══════════════════════════════════════════════════════════════════

pub struct SmtpMailer(AsyncSmtpTransport<Tokio1Executor>);

fn code_number(code: Code) -> Option<u16> {
    code.to_string().parse().ok()
}

impl MailTransport for SmtpMailer {
    async fn submit(&self, message: Message) -> Result<Receipt, SmtpFailure> {
        match self.0.send(message).await {
            Ok(response) => Ok(Receipt {
                code: code_number(response.code()).unwrap_or_default(),
                lines: response.message().map(str::to_string).collect(),
            }),
            Err(e) => Err(SmtpFailure {
                code: e.status().and_then(code_number),
                detail: e.to_string(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct AccountReply {
    status: String,
    user: Option<String>,
    pass: Option<String>,
    web: Option<String>,
    error: Option<String>,
}

pub struct LettreProvider {
    client: Client,
}

impl LettreProvider {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(headers::USER_AGENT)
            .timeout(Duration::from_secs(limits::REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

impl TransportProvider for LettreProvider {
    type Transport = SmtpMailer;

    async fn provision_test_account(&self) -> Result<TestAccount, DeliveryError> {
        let body = serde_json::json!({
            "requestor": mail::ETHEREAL_REQUESTOR,
            "version": env!("CARGO_PKG_VERSION"),
        });
        let reply: AccountReply = self
            .client
            .post(mail::ETHEREAL_ACCOUNT_API)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DeliveryError::Provision(e.to_string()))?
            .json()
            .await
            .map_err(|e| DeliveryError::Provision(e.to_string()))?;

        match (reply.status.as_str(), reply.user, reply.pass) {
            ("success", Some(user), Some(pass)) => Ok(TestAccount {
                user,
                pass,
                web: reply.web.unwrap_or_else(|| mail::ETHEREAL_WEB.to_string()),
            }),
            _ => Err(DeliveryError::Provision(
                reply.error.unwrap_or_else(|| format!("account service replied '{}'", reply.status)),
            )),
        }
    }

    fn connect(&self, relay: Relay, user: &str, pass: &str) -> Result<SmtpMailer, DeliveryError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(relay.host)
            .map_err(|e| DeliveryError::Build(e.to_string()))?
            .port(relay.port)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();
        Ok(SmtpMailer(transport))
    }
}

// ═══════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════

/// Outcome of a successful delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub mode: DeliveryMode,
    pub recipient: String,
    pub subject: String,
    pub preview_url: Option<String>,
}

pub fn subject_line(dated: bool, date: NaiveDate) -> String {
    if dated {
        format!("{} · {}", mail::SUBJECT, date.format(mail::SUBJECT_DATE_FORMAT))
    } else {
        mail::SUBJECT.to_string()
    }
}

pub fn sender_mailbox(mode: DeliveryMode, email: &str) -> Result<Mailbox, DeliveryError> {
    let address: Address = email.parse().map_err(|e: lettre::address::AddressError| {
        DeliveryError::Address { address: email.to_string(), reason: e.to_string() }
    })?;
    let name = match mode {
        DeliveryMode::TestInbox => format!("{}{}", mail::SENDER_NAME, mail::TEST_SENDER_SUFFIX),
        _ => mail::SENDER_NAME.to_string(),
    };
    Ok(Mailbox::new(Some(name), address))
}

/// Ethereal's web view for the message, or its inbox when the reply has no id
pub fn preview_url(web: &str, receipt: &Receipt) -> String {
    static MSGID: OnceLock<Regex> = OnceLock::new();
    let re = MSGID.get_or_init(|| Regex::new(r"MSGID=([^\s\]]+)").expect("static regex"));
    let web = web.trim_end_matches('/');

    receipt
        .lines
        .iter()
        .find_map(|line| re.captures(line))
        .map(|caps| format!("{}/message/{}", web, &caps[1]))
        .unwrap_or_else(|| format!("{}/messages", web))
}

pub struct DigestDispatcher<'a, P> {
    config: &'a Config,
    provider: &'a P,
}

impl<'a, P: TransportProvider> DigestDispatcher<'a, P> {
    pub fn new(config: &'a Config, provider: &'a P) -> Self {
        Self { config, provider }
    }

    fn build_message(&self, subject: &str, document: &str) -> Result<Message, DeliveryError> {
        let from = sender_mailbox(self.config.mode, &self.config.email_user)?;
        let to: Mailbox = self.config.receiver.parse().map_err(|e: lettre::address::AddressError| {
            DeliveryError::Address { address: self.config.receiver.clone(), reason: e.to_string() }
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(document.to_string())
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }

    /// Single delivery attempt, no retries
    pub async fn send(&self, document: &str) -> Result<Dispatched, DeliveryError> {
        let subject = subject_line(self.config.dated_subject, Local::now().date_naive());
        let recipient = self.config.receiver.clone();

        match self.config.mode {
            DeliveryMode::DryRun => {
                log::info!("[DRY_RUN] Skipping send. Would send to: {}", recipient);
                log::info!("[DRY_RUN] Subject: {}", subject);
                log::info!(
                    "[DRY_RUN] HTML length: {} bytes, {} chars",
                    document.len(),
                    document.chars().count()
                );
                Ok(Dispatched { mode: DeliveryMode::DryRun, recipient, subject, preview_url: None })
            }
            DeliveryMode::TestInbox => {
                let account = self.provider.provision_test_account().await?;
                log::info!("Provisioned test inbox {}", account.user);
                let transport = self.provider.connect(Relay::ETHEREAL, &account.user, &account.pass)?;
                let message = self.build_message(&subject, document)?;

                let receipt = transport
                    .submit(message)
                    .await
                    .map_err(|f| classify_smtp_failure(Relay::ETHEREAL, f.code, &f.detail))?;

                log::debug!("Ethereal replied {}: {:?}", receipt.code, receipt.lines);
                let preview = preview_url(&account.web, &receipt);
                log::info!("✅ Email sent via Ethereal. Preview URL: {}", preview);
                Ok(Dispatched {
                    mode: DeliveryMode::TestInbox,
                    recipient,
                    subject,
                    preview_url: Some(preview),
                })
            }
            DeliveryMode::LiveMailbox => {
                let transport = self.provider.connect(
                    Relay::GMAIL,
                    &self.config.email_user,
                    &self.config.email_pass,
                )?;
                let message = self.build_message(&subject, document)?;

                transport
                    .submit(message)
                    .await
                    .map_err(|f| classify_smtp_failure(Relay::GMAIL, f.code, &f.detail))?;

                log::info!("✅ Email sent to {}", recipient);
                Ok(Dispatched { mode: DeliveryMode::LiveMailbox, recipient, subject, preview_url: None })
            }
        }
    }
}

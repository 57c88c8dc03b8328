use crate::CONFIG;
use lettre::{
    smtp::{
        authentication::{Credentials, Mechanism},
        extension::ClientId,
        ConnectionReuseParameters,
    },
    SmtpClient, SmtpTransport, Transport,
};
use lettre_email::Email;
use tracing::info;

/// One outgoing message, whatever actually carries it.
pub trait Mailer {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> std::result::Result<(), String>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    /// Builds a mailer from the `MAIL_*` environment, or `None` when
    /// mailing is not configured.
    pub fn init() -> Option<SmtpMailer> {
        let conf = CONFIG.mail.as_ref()?;
        let client = SmtpClient::new_simple(&conf.server)
            .ok()?
            .hello_name(ClientId::Domain(conf.helo_name.clone()))
            .credentials(Credentials::new(
                conf.username.clone(),
                conf.password.clone(),
            ))
            .smtp_utf8(true)
            .authentication_mechanism(Mechanism::Plain)
            .connection_reuse(ConnectionReuseParameters::NoReuse);
        Some(SmtpMailer {
            transport: client.transport(),
            from: conf.from.clone(),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> std::result::Result<(), String> {
        let email = Email::builder()
            .from(self.from.as_str())
            .to(to)
            .subject(subject)
            .alternative(html, text)
            .build()
            .map_err(|err| err.to_string())?;
        self.transport
            .send(email.into())
            .map(|_| ())
            .map_err(|err| err.to_string())
    }
}

/// Logs messages instead of sending them, for local development.
pub struct DebugMailer;

impl Mailer for DebugMailer {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        _html: &str,
        text: &str,
    ) -> std::result::Result<(), String> {
        info!("to=<{}> subject={:?}\n{}", to, subject, text);
        Ok(())
    }
}

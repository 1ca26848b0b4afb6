use tracing::info;

/// Hands outgoing confirmation messages to the delivery transport.
///
/// Delivery itself is an external collaborator; this seam renders the
/// message and emits it on the log transport, which is also what the e2e
/// environment reads.
pub struct Mailer {
    from: String,
}

impl Mailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    pub fn send_confirmation_code(&self, recipient: &str, username: &str, code: &str) {
        info!(
            from = %self.from,
            to = %recipient,
            subject = "Your confirmation code",
            "Hello {username}, your confirmation code is: {code}"
        );
    }
}

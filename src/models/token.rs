use std::fmt;

/// Bearer token from the client-credentials exchange. Lives for one payment attempt.
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

impl AccessToken {
    pub fn is_empty(&self) -> bool {
        self.access_token.trim().is_empty()
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"*****")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::FetchError;

/// Anything that can answer a GET with a JSON document.
pub trait JsonSource {
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

impl<S: JsonSource + ?Sized> JsonSource for &S {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        (**self).get_json(url)
    }
}

/// Blocking HTTP source. No retries and no explicit timeouts.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self { client })
    }
}

impl JsonSource for HttpSource {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

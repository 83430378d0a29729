pub mod cipher;
mod report;

use std::time::Duration;

use chrono::Local;
use reqwest::Url;

pub use self::{
    cipher::{Cipher, DecodeError, Envelope},
    report::{ParseError, Report},
};
use crate::{coordinator::Fetch, prelude::*, snapshot::Snapshot};

pub const DEFAULT_URL: &str = "http://192.168.1.100/api/data";

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to communicate with the device")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode the device response")]
    Decode(#[from] DecodeError),

    #[error("failed to parse the device readings")]
    Parse(#[from] ParseError),
}

/// Encrypted local API client of the energy monitor.
pub struct Client {
    inner: reqwest::Client,
    url: Url,
    cipher: Cipher,
}

impl Client {
    #[instrument(skip_all, fields(url = %url))]
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!("ichijo-energy/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { inner, url, cipher: Cipher::default() })
    }

    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Check whether the device answers with a success status.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn discover(&self) -> bool {
        match self.inner.get(self.url.clone()).timeout(DISCOVERY_TIMEOUT).send().await {
            Ok(response) => {
                let status = response.status();
                info!(%status, "the device responded");
                status.is_success()
            }
            Err(error) => {
                warn!("the device did not respond: {error:#}");
                false
            }
        }
    }

    /// Request the readings of all time windows.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<Snapshot, Error> {
        let body = self
            .inner
            .post(self.url.clone())
            .json(&self.cipher.seal(CURRENT_DATA))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let envelope: Envelope = serde_json::from_slice(&body).map_err(DecodeError::from)?;
        let plaintext = self.cipher.open(&envelope)?;
        debug!(%plaintext, "decrypted");
        let snapshot = plaintext.parse::<Report>()?.into_snapshot(Local::now())?;
        info!(
            solar = %snapshot.power.solar(),
            grid = %snapshot.power.grid(),
            battery = %snapshot.power.battery(),
            home = %snapshot.power.home(),
            state_of_charge = ?snapshot.state_of_charge,
            "fetched"
        );
        Ok(snapshot)
    }
}

impl Fetch for Client {
    type Error = Error;

    async fn fetch(&self) -> Result<Snapshot, Self::Error> {
        Self::fetch(self).await
    }
}

/// Plaintext request for the readings, the field order matters to the firmware.
// language=json
const CURRENT_DATA: &str =
    r#"{"id":"usBDG07249","pass":"acc04fef4","cmd":"current_data","req_data":""}"#;

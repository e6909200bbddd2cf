use crate::config::Config;
use crate::error::TransportError;
use crate::transport::{
    IMAGE_FIELD, PREDICT_PATH, PredictionRequest, PredictionResult, PredictionTransport,
    ROAD_CONDITIONS_PATH, decode_prediction, decode_road_conditions, status_error,
};
use reqwest::multipart::{Form, Part};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

pub struct HttpTransport {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        Self::build(base_url.into(), timeout, None)
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::build(
            config.base_url().to_string(),
            config.request_timeout(),
            config.user_agent(),
        )
    }

    fn build(
        base_url: String,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent.to_string());
        }
        let client = builder
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read_body(
        &self,
        response: reqwest::Response,
    ) -> Result<(u16, Vec<u8>), TransportError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok((status, body.to_vec()))
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PredictionTransport for HttpTransport {
    async fn fetch_road_conditions(&self) -> Result<Vec<String>, TransportError> {
        let url = self.endpoint(ROAD_CONDITIONS_PATH);
        let response = self.client.get(&url).send().await.map_err(|err| {
            warn!(url = %url, error = %err, "Road condition request failed");
            TransportError::Network(err.to_string())
        })?;

        let (status, body) = self.read_body(response).await?;
        if !(200..300).contains(&status) {
            warn!(url = %url, status, "Road condition request rejected");
            return Err(status_error(status, &body));
        }
        decode_road_conditions(&body)
    }

    async fn predict(&self, request: PredictionRequest) -> Result<PredictionResult, TransportError> {
        let url = self.endpoint(PREDICT_PATH);
        let form = build_form(&request);
        info!(
            url = %url,
            image = request.image.name(),
            bytes = request.image.byte_len(),
            "Sending prediction request"
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                warn!(url = %url, error = %err, "Failed to reach prediction service");
                TransportError::Network(err.to_string())
            })?;

        let (status, body) = self.read_body(response).await?;
        if !(200..300).contains(&status) {
            let err = status_error(status, &body);
            warn!(url = %url, status, error = %err, "Prediction service returned an error");
            return Err(err);
        }
        decode_prediction(&body)
    }
}

fn build_form(request: &PredictionRequest) -> Form {
    let image = &request.image;
    let part = Part::bytes(image.bytes().to_vec()).file_name(image.name().to_string());
    let part = match part.mime_str(image.content_type()) {
        Ok(part) => part,
        Err(err) => {
            warn!(content_type = image.content_type(), error = %err, "Unusable image content type");
            Part::bytes(image.bytes().to_vec()).file_name(image.name().to_string())
        }
    };

    request
        .form_fields()
        .into_iter()
        .fold(Form::new().part(IMAGE_FIELD, part), |form, (name, value)| {
            form.text(name, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() -> Result<(), TransportError> {
        let transport = HttpTransport::new("http://localhost:5000/", Duration::from_secs(5))?;

        assert_eq!(transport.base_url(), "http://localhost:5000");
        assert_eq!(
            transport.endpoint(PREDICT_PATH),
            "http://localhost:5000/api/predict"
        );
        Ok(())
    }

    #[test]
    fn debug_omits_client_internals() -> Result<(), TransportError> {
        let transport = HttpTransport::new("http://localhost:5000", Duration::from_secs(5))?;
        let rendered = format!("{transport:?}");

        assert!(rendered.contains("http://localhost:5000"));
        assert!(!rendered.contains("client"));
        Ok(())
    }

    #[test]
    fn from_config_uses_service_section() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(
            r#"
[app]
name = "tire-lifespan-session"

[logging]
level = "debug"

[service]
base_url = "http://predictor.local:8080/"
timeout_secs = 5
"#,
        )?;

        let transport = HttpTransport::from_config(&config)?;

        assert_eq!(transport.base_url(), "http://predictor.local:8080");
        assert_eq!(transport.timeout, Duration::from_secs(5));
        Ok(())
    }
}

use super::{Classifier, ClassifyError, Instance, Prediction};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("editcheck/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    predictions: Vec<Prediction>,
}

/// Classifier reached over HTTP: the instances are POSTed as a JSON array and
/// the service answers with `{"predictions": [...]}` in request order.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, instances: Vec<Instance>) -> Result<Vec<Prediction>, ClassifyError> {
        tracing::debug!(url = %self.url, count = instances.len(), "sending classifier request");

        let response = self
            .client
            .post(&self.url)
            .json(&instances)
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        decode(&body)
    }
}

fn decode(body: &[u8]) -> Result<Vec<Prediction>, ClassifyError> {
    serde_json::from_slice::<PredictionResponse>(body)
        .map(|response| response.predictions)
        .map_err(|e| ClassifyError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_predictions() {
        let body = br#"{"predictions": [
            {"prediction": true, "probability": 0.92},
            {"prediction": false, "probability": 0.08}
        ]}"#;
        let predictions = decode(body).unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions[0].prediction);
        assert!((predictions[1].probability - 0.08).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_rejects_unexpected_shape() {
        assert!(matches!(
            decode(br#"{"result": []}"#),
            Err(ClassifyError::Malformed(_))
        ));
        assert!(matches!(decode(b"not json"), Err(ClassifyError::Malformed(_))));
    }

    #[test]
    fn test_instances_serialize_with_wire_names() {
        let instance = Instance {
            modified_text: "Totally the best.".to_string(),
            page_title: "Cats".to_string(),
            original_text: String::new(),
            check_type: "tone".to_string(),
            lang: "en".to_string(),
        };
        let value = serde_json::to_value(vec![instance]).unwrap();
        assert_eq!(value[0]["modified_text"], "Totally the best.");
        assert_eq!(value[0]["original_text"], "");
        assert_eq!(value[0]["check_type"], "tone");
    }

    #[test]
    fn test_client_builds() {
        let classifier = HttpClassifier::new("http://localhost:9/predict").unwrap();
        assert_eq!(classifier.url(), "http://localhost:9/predict");
    }
}

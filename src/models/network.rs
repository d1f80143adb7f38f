use super::error::{AppError, UpstreamError};
use serde::{Deserialize, Deserializer, Serialize};

/// A named group of sensors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Network {
    pub id: String,
    pub name: String,
}

/// A single telemetry device, belonging to exactly one network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    pub network_id: String,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// Returns the id of the network whose name matches exactly.
pub fn find_network_id(networks: &[Network], name: &str) -> Result<String, AppError> {
    networks
        .iter()
        .find(|n| n.name == name)
        .map(|n| n.id.clone())
        .ok_or_else(|| UpstreamError::NotFound(format!("network '{name}'")).into())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(u64),
    Text(String),
}

impl From<IdRepr> for String {
    fn from(id: IdRepr) -> Self {
        match id {
            IdRepr::Number(n) => n.to_string(),
            IdRepr::Text(s) => s,
        }
    }
}

/// Monnit ids are numbers in API payloads but are handled as strings here.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    IdRepr::deserialize(deserializer).map(Into::into)
}

pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<IdRepr>::deserialize(deserializer).map(|id| id.map(Into::into))
}

pub fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = Vec::<IdRepr>::deserialize(deserializer)?;
    Ok(ids.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn networks() -> Vec<Network> {
        vec![
            Network {
                id: "1001".to_string(),
                name: "Labo-GBZ".to_string(),
            },
            Network {
                id: "1002".to_string(),
                name: "Warehouse".to_string(),
            },
        ]
    }

    #[test]
    fn test_find_network_id() {
        assert_eq!(find_network_id(&networks(), "Warehouse").unwrap(), "1002");
    }

    #[test]
    fn test_find_network_id_is_exact() {
        let result = find_network_id(&networks(), "labo-gbz");
        assert!(matches!(
            result,
            Err(AppError::UpstreamError(UpstreamError::NotFound(_)))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(networks()[0].to_string(), "Labo-GBZ (1001)");

        let mut sensor = Sensor {
            id: "345749".to_string(),
            name: "Fridge".to_string(),
            network_id: "1001".to_string(),
        };
        assert_eq!(sensor.to_string(), "Fridge (345749)");
        sensor.name.clear();
        assert_eq!(sensor.to_string(), "345749");
    }

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Ids {
            #[serde(deserialize_with = "deserialize_ids")]
            ids: Vec<String>,
        }

        let parsed: Ids = serde_json::from_str(r#"{"ids": [345749, "345750"]}"#).unwrap();
        assert_eq!(parsed.ids, vec!["345749", "345750"]);
    }
}

//! Piattaforma annunci: configurazione per progetto e creazione annuncio

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::utils::epoch_millis;

/// Account, campagna e gruppo annunci di un progetto
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdConfig {
    pub account_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
}

/// Mappa nome progetto → configurazione annunci
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdAccountRegistry {
    projects: HashMap<String, AdConfig>,
}

impl AdAccountRegistry {
    /// Registro con il solo progetto segnaposto "NB"
    pub fn placeholder() -> Self {
        let mut registry = Self::default();
        registry.insert(
            "NB",
            AdConfig {
                account_id: "YOUR_ACCOUNT_ID".to_string(),
                campaign_id: "YOUR_CAMPAIGN_ID".to_string(),
                ad_group_id: "YOUR_AD_GROUP_ID".to_string(),
            },
        );
        registry
    }

    /// Carica il registro da un file JSON `{"progetto": {...}}`
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&raw)?;
        if registry.is_empty() {
            tracing::warn!("Nessun progetto configurato in {}", path.display());
        }
        Ok(registry)
    }

    /// Registro dal percorso configurato, altrimenti il segnaposto
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::placeholder()),
        }
    }

    fn insert(&mut self, project: impl Into<String>, config: AdConfig) {
        self.projects.insert(project.into(), config);
    }

    pub fn get(&self, project: &str) -> Option<&AdConfig> {
        self.projects.get(project)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait]
pub trait AdPlatform: Send + Sync {
    /// Crea un annuncio video e ne restituisce l'ID
    async fn create_video_ad(&self, config: &AdConfig, video_url: &str, ad_name: &str)
        -> Result<String>;
}

/// Creazione simulata: nessuna chiamata esterna, ID `AD_<millis>`
#[derive(Debug, Clone, Default)]
pub struct SimulatedAdPlatform;

#[async_trait]
impl AdPlatform for SimulatedAdPlatform {
    async fn create_video_ad(
        &self,
        config: &AdConfig,
        video_url: &str,
        ad_name: &str,
    ) -> Result<String> {
        if video_url.trim().is_empty() {
            return Err(AppError::AdCreation("URL video mancante".to_string()));
        }

        tracing::info!(
            account = %config.account_id,
            campaign = %config.campaign_id,
            ad_group = %config.ad_group_id,
            video_url,
            ad_name,
            "Creazione annuncio simulata"
        );

        Ok(format!("AD_{}", epoch_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_placeholder_registry() {
        let registry = AdAccountRegistry::placeholder();
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.get("NB").unwrap().ad_group_id, "YOUR_AD_GROUP_ID");
        assert!(registry.get("TEST").is_none());
    }

    #[test]
    fn test_registry_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"NB": {{"account_id": "123", "campaign_id": "456", "ad_group_id": "789"}},
                "OM": {{"account_id": "a", "campaign_id": "b", "ad_group_id": "c"}}}}"#
        )
        .unwrap();

        let registry = AdAccountRegistry::load(Some(file.path())).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("NB").unwrap().campaign_id, "456");
        assert_eq!(registry.get("OM").unwrap().account_id, "a");
    }

    #[test]
    fn test_registry_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(matches!(
            AdAccountRegistry::from_file(file.path()),
            Err(AppError::Json(_))
        ));
        assert!(AdAccountRegistry::from_file(Path::new("/non/esiste.json")).is_err());
    }

    #[tokio::test]
    async fn test_simulated_ad_id() {
        let registry = AdAccountRegistry::placeholder();
        let config = registry.get("NB").unwrap();
        let id = SimulatedAdPlatform
            .create_video_ad(config, "https://www.youtube.com/watch?v=abc", "NB_広告")
            .await
            .unwrap();
        assert!(id.starts_with("AD_"));
        assert!(id[3..].parse::<i64>().is_ok());

        assert!(SimulatedAdPlatform
            .create_video_ad(config, " ", "NB_広告")
            .await
            .is_err());
    }
}

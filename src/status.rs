//! Persistance du statut du serveur.
//!
//! Le statut est un instantané JSON : compteurs BootID/ConfigID, empreintes
//! des descriptions, valeurs textuelles des variables d'état et variables
//! locales de l'application. Il est relu au démarrage (ré-hydratation et
//! détection de dérive de configuration) et réécrit à l'arrêt.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Clé d'empreinte de la description du root device.
pub const ROOT_HASH_KEY: &str = "device::root";

/// Préfixe des clés d'empreinte des descriptions de services.
pub const SERVICE_HASH_PREFIX: &str = "service::";

/// Préfixe des variables de typage d'argument, jamais persistées.
pub const ARG_TYPE_PREFIX: &str = "A_ARG_TYPE_";

/// Instantané persisté du serveur.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    pub boot_id: u32,
    pub config_id: u32,

    /// `device::root` et `service::<id>` → empreinte FNV du contenu
    #[serde(default)]
    pub file_hashes: HashMap<String, u64>,

    /// id de service → (nom de variable → valeur textuelle)
    #[serde(default)]
    pub state_vars: HashMap<String, HashMap<String, String>>,

    /// variables locales de l'application
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub local_vars: HashMap<String, String>,
}

impl Status {
    /// Lit le statut depuis un fichier JSON. Un fichier absent n'est pas une
    /// erreur : le statut par défaut est retourné.
    pub fn read<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("status file does not (yet) exist");
            return Ok(Status::default());
        }

        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("status file '{}' couldn't be unmarshalled: {}", path.display(), e),
            )
        })
    }

    /// Écrit le statut dans un fichier JSON.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let out = serde_json::to_vec_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("status couldn't be marshalled: {}", e),
            )
        })?;
        std::fs::write(path, out)
    }
}

/// Une variable de typage d'argument n'a pas d'état propre : elle ne se
/// persiste pas et ne se ré-hydrate pas.
pub fn is_arg_type_var(name: &str) -> bool {
    name.len() >= ARG_TYPE_PREFIX.len()
        && name[..ARG_TYPE_PREFIX.len()].eq_ignore_ascii_case(ARG_TYPE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_default() {
        let status = Status::read("/nonexistent/status.json").unwrap();
        assert_eq!(status.boot_id, 0);
        assert_eq!(status.config_id, 0);
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");

        let mut status = Status {
            boot_id: 3,
            config_id: 7,
            ..Default::default()
        };
        status
            .file_hashes
            .insert(ROOT_HASH_KEY.to_string(), 0xdeadbeef);
        status.state_vars.insert(
            "CD".to_string(),
            HashMap::from([("Counter".to_string(), "5".to_string())]),
        );
        status
            .local_vars
            .insert("answer".to_string(), "42".to_string());

        status.write(&path).unwrap();
        let back = Status::read(&path).unwrap();
        assert_eq!(back.boot_id, 3);
        assert_eq!(back.config_id, 7);
        assert_eq!(back.file_hashes[ROOT_HASH_KEY], 0xdeadbeef);
        assert_eq!(back.state_vars["CD"]["Counter"], "5");
        assert_eq!(back.local_vars["answer"], "42");
    }

    #[test]
    fn test_arg_type_prefix_is_case_insensitive() {
        assert!(is_arg_type_var("A_ARG_TYPE_Filter"));
        assert!(is_arg_type_var("a_arg_type_filter"));
        assert!(!is_arg_type_var("Counter"));
        // plus court que le préfixe : pas de panique
        assert!(!is_arg_type_var("A_ARG"));
    }
}

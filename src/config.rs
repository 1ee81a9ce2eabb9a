//! Configuration du serveur UPnP.

use serde::Deserialize;

/// Configuration du serveur.
///
/// Le chargement depuis un fichier est laissé à l'application ; la structure
/// se désérialise telle quelle depuis du JSON ou du YAML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Noms des interfaces réseau à utiliser. Vide : toutes les interfaces
    /// utilisables.
    pub interfaces: Vec<String>,

    /// Port d'écoute HTTP. 0 : choisi par le système.
    pub port: u16,

    /// Durée de validité des annonces SSDP, en secondes.
    pub max_age: u32,

    /// Nom du produit, pour la chaîne SERVER.
    pub product_name: String,

    /// Version du produit, pour la chaîne SERVER.
    pub product_version: String,

    /// Chemin du fichier JSON de statut persisté.
    pub status_file: String,

    /// Répertoire racine des icônes servies sous /device/.
    pub icon_root_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            port: 0,
            max_age: 86400,
            product_name: String::new(),
            product_version: String::new(),
            status_file: "./status.json".to_string(),
            icon_root_dir: ".".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.max_age, 86400);
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.status_file, "./status.json");
    }

    #[test]
    fn test_deserialize_partial() {
        let cfg: Config =
            serde_json::from_str(r#"{"port": 8008, "product_name": "demo"}"#).unwrap();
        assert_eq!(cfg.port, 8008);
        assert_eq!(cfg.product_name, "demo");
        // les champs absents prennent les défauts
        assert_eq!(cfg.max_age, 86400);
    }
}

//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Ce module implémente le protocole SSDP côté device : annonces alive et
//! byebye en multicast, réponses aux requêtes M-SEARCH. Un serveur SSDP est
//! créé par interface réseau utilisable ; tous partagent les données de
//! découverte, l'index de recherche et les compteurs BootID/ConfigID.
//!
//! ## Fonctionnalités
//!
//! - ✅ Annonces alive en trois passes, ré-annonce jitterée < MaxAge/2
//! - ✅ Byebye en trois passes à la déconnexion
//! - ✅ Réponses M-SEARCH en UDP étalé sur MX, ou en TCP (TCPPORT.UPNP.ORG)
//! - ✅ Correspondance de version : une recherche v1 matche un service v3
//!
//! ## Constantes SSDP
//!
//! - **Adresse multicast** : 239.255.255.250:1900
//! - **MX maximal** : 5 secondes

mod search;
mod server;

use std::collections::HashMap;
use std::net::SocketAddrV4;

use once_cell::sync::Lazy;
use regex::Regex;

pub use search::SearchRequest;
pub use server::SsdpServer;

use crate::model::{DeviceTree, ServiceMap};

/// Adresse multicast SSDP.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Adresse multicast SSDP décodée.
pub static SSDP_GROUP: Lazy<SocketAddrV4> =
    Lazy::new(|| SSDP_MULTICAST_ADDR.parse().expect("invalid SSDP group"));

/// Cible de recherche « tous les assets ».
pub const ST_ALL: &str = "ssdp:all";

/// Cible de recherche « root device ».
pub const ST_ROOT: &str = "upnp:rootdevice";

/// Borne haute du champ MX d'une recherche multicast.
pub const MAX_MX_SECONDS: u64 = 5;

static RE_TYPES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^urn:.+:(device|service):.+:.+$").unwrap());

/// Couple NT/USN d'un asset annoncé par SSDP.
#[derive(Debug, Clone)]
pub struct AssetId {
    pub nt: String,
    pub usn: String,
}

/// Données de l'arbre de devices nécessaires aux messages de découverte.
#[derive(Debug, Clone)]
pub struct DiscoveryData {
    /// URL de description, avec `{{ADDRESS}}` à substituer par l'adresse de
    /// l'interface émettrice
    pub location: String,
    pub server: String,
    pub max_age: u32,
    pub assets: Vec<AssetId>,
}

/// Dérive les assets SSDP de l'arbre de devices : root device, UDN, type de
/// device et types de services, récursivement.
pub fn device_assets(tree: &DeviceTree, services: &ServiceMap) -> Vec<AssetId> {
    let mut assets = Vec::new();
    collect_assets(tree, services, 0, true, &mut assets);
    assets
}

fn collect_assets(
    tree: &DeviceTree,
    services: &ServiceMap,
    index: usize,
    is_root: bool,
    assets: &mut Vec<AssetId>,
) {
    let node = tree.node(index);

    if is_root {
        assets.push(AssetId {
            nt: ST_ROOT.to_string(),
            usn: format!("{}::{}", node.udn, ST_ROOT),
        });
    }
    assets.push(AssetId {
        nt: node.udn.clone(),
        usn: node.udn.clone(),
    });
    assets.push(AssetId {
        nt: node.device_type.clone(),
        usn: format!("{}::{}", node.udn, node.device_type),
    });

    for id in &node.services {
        if let Some(svc) = services.get(id) {
            let typ = svc.versioned_type();
            assets.push(AssetId {
                nt: typ.clone(),
                usn: format!("{}::{}", node.udn, typ),
            });
        }
    }

    for child in &node.children {
        collect_assets(tree, services, *child, false, assets);
    }
}

/// Index de recherche : cible (root device, UDN, type de device, type de
/// service) → USN à émettre en réponse.
#[derive(Debug, Default, Clone)]
pub struct SearchIndex {
    entries: HashMap<String, Vec<String>>,
}

impl SearchIndex {
    /// Construit l'index depuis l'arbre de devices.
    pub fn build(tree: &DeviceTree, services: &ServiceMap) -> Self {
        let mut index = SearchIndex::default();
        index.collect(tree, services, 0, true);
        index
    }

    fn collect(&mut self, tree: &DeviceTree, services: &ServiceMap, index: usize, is_root: bool) {
        let node = tree.node(index);

        if is_root {
            self.entries
                .entry(ST_ROOT.to_string())
                .or_default()
                .push(format!("{}::{}", node.udn, ST_ROOT));
        }

        self.entries
            .entry(node.udn.clone())
            .or_insert_with(|| vec![format!("{}::{}", node.udn, node.device_type)]);

        self.entries
            .entry(node.device_type.clone())
            .or_default()
            .push(format!("{}::{}", node.udn, node.device_type));

        for id in &node.services {
            if let Some(svc) = services.get(id) {
                let typ = svc.versioned_type();
                self.entries
                    .entry(typ.clone())
                    .or_default()
                    .push(format!("{}::{}", node.udn, typ));
            }
        }

        for child in &node.children {
            self.collect(tree, services, *child, false);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Vec<String>> {
        self.entries.get(key)
    }

    /// Cherche la cible exacte, ou une entrée de type device/service
    /// compatible (même genre, version supérieure ou égale à celle demandée).
    pub fn retrieve(&self, target: &str) -> Option<&Vec<String>> {
        if let Some(usns) = self.entries.get(target) {
            return Some(usns);
        }
        if RE_TYPES.is_match(target) {
            for (key, usns) in &self.entries {
                if is_compatible(target, key) {
                    return Some(usns);
                }
            }
        }
        None
    }
}

/// Vérifie que `requested` et `offered` désignent le même type de device ou
/// de service, et que la version offerte couvre la version demandée.
fn is_compatible(requested: &str, offered: &str) -> bool {
    if !RE_TYPES.is_match(requested) || !RE_TYPES.is_match(offered) {
        return false;
    }
    let Some((req_prefix, req_ver)) = requested.rsplit_once(':') else {
        return false;
    };
    let Some((off_prefix, off_ver)) = offered.rsplit_once(':') else {
        return false;
    };
    if req_prefix != off_prefix {
        return false;
    }
    match (req_ver.parse::<u32>(), off_ver.parse::<u32>()) {
        (Ok(req), Ok(off)) => req <= off,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::desc::fixtures;
    use crate::model;
    use crate::state_variables::CHANGE_CHANNEL_CAPACITY;

    fn built() -> (DeviceTree, ServiceMap) {
        let (tx, _rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        model::build(&fixtures::root_device(), &fixtures::service_map(), tx).unwrap()
    }

    #[test]
    fn test_device_assets() {
        let (tree, services) = built();
        let assets = device_assets(&tree, &services);
        // root + udn + type de device + un service
        assert_eq!(assets.len(), 4);
        assert_eq!(assets[0].nt, ST_ROOT);
        assert_eq!(
            assets[0].usn,
            "uuid:11111111-1111-1111-1111-111111111111::upnp:rootdevice"
        );
        assert_eq!(assets[1].nt, assets[1].usn);
        assert!(assets[3].nt.ends_with("ContentDirectory:3"));
    }

    #[test]
    fn test_index_exact_retrieval() {
        let (tree, services) = built();
        let index = SearchIndex::build(&tree, &services);
        assert!(index.retrieve(ST_ROOT).is_some());
        assert!(index
            .retrieve("uuid:11111111-1111-1111-1111-111111111111")
            .is_some());
        assert!(index.retrieve("urn:nothing:here").is_none());
    }

    #[test]
    fn test_index_version_compatibility() {
        let (tree, services) = built();
        let index = SearchIndex::build(&tree, &services);
        // l'index contient ContentDirectory:3 : les versions 1 à 3 matchent
        assert!(index
            .retrieve("urn:schemas-upnp-org:service:ContentDirectory:1")
            .is_some());
        assert!(index
            .retrieve("urn:schemas-upnp-org:service:ContentDirectory:3")
            .is_some());
        assert!(index
            .retrieve("urn:schemas-upnp-org:service:ContentDirectory:4")
            .is_none());
        assert!(index
            .retrieve("urn:schemas-upnp-org:service:ConnectionManager:1")
            .is_none());
    }

    #[test]
    fn test_is_compatible() {
        assert!(is_compatible(
            "urn:schemas-upnp-org:service:ContentDirectory:2",
            "urn:schemas-upnp-org:service:ContentDirectory:10"
        ));
        assert!(!is_compatible(
            "urn:schemas-upnp-org:service:ContentDirectory:10",
            "urn:schemas-upnp-org:service:ContentDirectory:2"
        ));
        assert!(!is_compatible(
            "urn:schemas-upnp-org:device:MediaServer:1",
            "urn:schemas-upnp-org:service:MediaServer:1"
        ));
        assert!(!is_compatible("upnp:rootdevice", "upnp:rootdevice"));
    }
}

//! Analyse des requêtes M-SEARCH et assemblage des réponses.

use std::collections::HashMap;

use chrono::Utc;

use crate::ids::{BootId, ConfigId};
use crate::ssdp::{
    DiscoveryData, SearchIndex, MAX_MX_SECONDS, SSDP_MULTICAST_ADDR, ST_ALL, ST_ROOT,
};

/// Requête de recherche analysée et jugée pertinente.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Cible de recherche, retournée telle quelle dans le champ ST
    pub st: String,
    /// Étalement des réponses UDP, en secondes
    pub mx: u64,
    /// Port TCP demandé par TCPPORT.UPNP.ORG (0 : réponses UDP)
    pub tcp_port: u16,
}

/// Parse le texte d'un datagramme en requête HTTP sommaire : méthode,
/// en-têtes à clés normalisées en majuscules. Retourne `None` si le
/// datagramme n'est pas une requête bien formée (à ignorer en silence).
fn parse_http_request(msg: &str) -> Option<(String, HashMap<String, String>)> {
    let mut lines = msg.split("\r\n");

    let request_line = lines.next()?;
    let mut parts = request_line.splitn(3, ' ');
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let version = parts.next()?;
    if target != "*" || !version.starts_with("HTTP/") {
        return None;
    }

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.insert(name.trim().to_uppercase(), value.trim().to_string());
    }

    Some((method, headers))
}

/// Analyse un datagramme de recherche.
///
/// Retourne `None` pour tout ce qui doit être ignoré en silence : méthode
/// autre que M-SEARCH, champ MAN incorrect, MX multicast illisible, cible
/// sans correspondance dans l'index.
pub fn analyze(msg: &str, index: &SearchIndex) -> Option<SearchRequest> {
    let (method, headers) = parse_http_request(msg)?;

    if method != "M-SEARCH" {
        return None;
    }
    // les guillemets font partie de la valeur imposée
    if headers.get("MAN").map(String::as_str) != Some("\"ssdp:discover\"") {
        return None;
    }

    let is_multicast = headers.get("HOST").map(String::as_str) == Some(SSDP_MULTICAST_ADDR);

    let mx = if is_multicast {
        // MX est obligatoire pour une recherche multicast, plafonné à 5 s
        let mx: u64 = headers.get("MX")?.parse().ok()?;
        mx.min(MAX_MX_SECONDS)
    } else {
        1
    };

    let st = headers.get("ST")?.clone();
    let relevant =
        st == ST_ALL || st == ST_ROOT || index.retrieve(&st).is_some();
    if !relevant {
        return None;
    }

    let tcp_port = headers
        .get("TCPPORT.UPNP.ORG")
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);

    Some(SearchRequest { st, mx, tcp_port })
}

fn response_msg(
    data: &DiscoveryData,
    addr: &str,
    st: &str,
    usn: &str,
    boot_id: u32,
    config_id: u32,
) -> String {
    let mut msg = String::new();
    msg.push_str("HTTP/1.1 200 OK\r\n");
    msg.push_str(&format!("CACHE-CONTROL: max-age={}\r\n", data.max_age));
    msg.push_str(&format!(
        "DATE: {}\r\n",
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT")
    ));
    msg.push_str("EXT:\r\n");
    msg.push_str(&format!(
        "LOCATION: {}\r\n",
        data.location.replace("{{ADDRESS}}", addr)
    ));
    msg.push_str(&format!("SERVER: {}\r\n", data.server));
    msg.push_str(&format!("ST: {}\r\n", st));
    msg.push_str(&format!("USN: {}\r\n", usn));
    msg.push_str(&format!("BOOTID.UPNP.ORG: {}\r\n", boot_id));
    msg.push_str(&format!("CONFIG.UPNP.ORG: {}\r\n", config_id));
    msg.push_str("\r\n");
    msg
}

/// Assemble les messages de réponse à une recherche.
///
/// En UDP, une réponse par USN. En TCP (TCPPORT.UPNP.ORG présent), un seul
/// message dont le champ USN joint toutes les correspondances par des
/// virgules.
pub fn assemble_responses(
    data: &DiscoveryData,
    index: &SearchIndex,
    addr: &str,
    req: &SearchRequest,
    boot_id: &BootId,
    config_id: &ConfigId,
) -> Vec<String> {
    let boot = boot_id.val();
    let config = config_id.val();

    let usns: Vec<String> = match req.st.as_str() {
        ST_ALL => data.assets.iter().map(|a| a.usn.clone()).collect(),
        ST_ROOT => {
            // l'arbre n'a qu'une racine : exactement une entrée attendue
            match index.get(ST_ROOT) {
                Some(usns) if usns.len() == 1 => usns.clone(),
                _ => return Vec::new(),
            }
        }
        st => match index.retrieve(st) {
            Some(usns) if !usns.is_empty() => usns.clone(),
            _ => return Vec::new(),
        },
    };

    if req.tcp_port != 0 {
        vec![response_msg(
            data,
            addr,
            &req.st,
            &usns.join(","),
            boot,
            config,
        )]
    } else {
        usns.iter()
            .map(|usn| response_msg(data, addr, &req.st, usn, boot, config))
            .collect()
    }
}

//! Abonnements aux événements et livraison des NOTIFY unicast.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::task::JoinHandle;
use tracing::{info, trace};
use url::Url;
use uuid::Uuid;

use crate::events::{marshal_state_vars, EventingError, MIN_SUB_TIMEOUT_SECS};
use crate::network;
use crate::state_variables::StateVariable;

static RE_CALLBACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(<[^<>]+>)+$").unwrap());
static RE_TIMEOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Second-(\d+)$").unwrap());

/// Abonnement d'un destinataire à toutes les variables événementielles.
///
/// Le compteur de séquence n'avance que sur livraison réussie : la suite des
/// SEQ effectivement reçus par l'abonné est 0, 1, 2, ... sans trous.
pub struct Subscription {
    sid: Uuid,
    /// URLs de rappel, dans l'ordre de préférence du souscripteur
    urls: Vec<Url>,
    state_vars: Vec<Arc<StateVariable>>,
    /// verrou async : tenu pendant tout l'envoi, il sérialise les NOTIFY
    /// d'un même abonnement
    sequence: tokio::sync::Mutex<u32>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    pub(crate) fn new(sid: Uuid, urls: Vec<Url>, state_vars: Vec<Arc<StateVariable>>) -> Self {
        Self {
            sid,
            urls,
            state_vars,
            sequence: tokio::sync::Mutex::new(0),
            timer: Mutex::new(None),
        }
    }

    pub fn sid(&self) -> Uuid {
        self.sid
    }

    /// Remplace le timer d'expiration courant.
    pub(crate) fn arm_timer(&self, timer: JoinHandle<()>) {
        let mut slot = self.timer.lock().unwrap();
        if let Some(old) = slot.replace(timer) {
            old.abort();
        }
    }

    pub(crate) fn disarm_timer(&self) {
        if let Some(timer) = self.timer.lock().unwrap().take() {
            timer.abort();
        }
    }

    /// Envoie un NOTIFY à l'abonné.
    ///
    /// Le corps porte la liste complète des variables de l'abonnement (le
    /// premier NOTIFY d'un nouvel abonnement doit porter toutes les
    /// variables événementielles). Les URLs sont essayées dans l'ordre de
    /// préférence ; le premier envoi réussi arrête la tournée et fait
    /// avancer la séquence. Un échec sur toutes les URLs n'avance pas la
    /// séquence et ne résilie pas l'abonnement : le destinataire peut
    /// revenir avant le timeout.
    pub(crate) async fn send_event(&self) {
        let body = marshal_state_vars(&self.state_vars);
        let mut sequence = self.sequence.lock().await;

        for url in &self.urls {
            let Some(host) = url.host_str() else { continue };
            let port = url.port_or_known_default().unwrap_or(80);
            let target = format!("{}:{}", host, port);
            let path = if url.path().is_empty() { "/" } else { url.path() };

            let mut msg = String::new();
            msg.push_str(&format!("NOTIFY {} HTTP/1.1\r\n", path));
            msg.push_str(&format!("HOST: {}:{}\r\n", host, port));
            msg.push_str("CONTENT-TYPE: text/xml; charset=\"utf-8\"\r\n");
            msg.push_str(&format!("CONTENT-LENGTH: {}\r\n", body.len()));
            msg.push_str("NT: upnp:event\r\n");
            msg.push_str("NTS: upnp:propchange\r\n");
            msg.push_str(&format!("SID: uuid:{}\r\n", self.sid));
            msg.push_str(&format!("SEQ: {}\r\n", *sequence));
            msg.push_str("\r\n");
            msg.push_str(&body);
            msg.push_str("\r\n");

            if let Err(e) = network::send_tcp(&target, msg.as_bytes()).await {
                info!("cannot send subscription event to {}: {}", target, e);
                continue;
            }

            trace!("sent subscription event to {}, seq={}", target, *sequence);
            *sequence += 1;
            return;
        }
    }
}

/// Parse le champ CALLBACK d'une demande d'abonnement.
///
/// Format imposé : `<url_1><url_2>...<url_n>`, chaque url étant une URL
/// absolue valide ; au moins une URL est requise.
pub fn parse_callback(callback: &str) -> Result<Vec<Url>, EventingError> {
    if !RE_CALLBACK.is_match(callback) {
        return Err(EventingError::MalformedCallback(callback.to_string()));
    }

    let inner = &callback[1..callback.len() - 1];
    let mut urls = Vec::new();
    for s in inner.split("><") {
        let url =
            Url::parse(s).map_err(|_| EventingError::MalformedCallback(s.to_string()))?;
        if !url.has_host() {
            return Err(EventingError::MalformedCallback(s.to_string()));
        }
        urls.push(url);
    }

    if urls.is_empty() {
        return Err(EventingError::MalformedCallback(callback.to_string()));
    }
    Ok(urls)
}

/// Parse le champ TIMEOUT d'une demande d'abonnement.
///
/// Format : `Second-<n>`. Champ absent ou valeur sous le minimum : le
/// minimum de 1800 s s'applique.
pub fn parse_timeout(timeout: &str) -> Result<Duration, EventingError> {
    if timeout.is_empty() {
        return Ok(Duration::from_secs(MIN_SUB_TIMEOUT_SECS));
    }

    let caps = RE_TIMEOUT
        .captures(timeout)
        .ok_or_else(|| EventingError::MalformedTimeout(timeout.to_string()))?;
    let secs: u64 = caps[1]
        .parse()
        .map_err(|_| EventingError::MalformedTimeout(timeout.to_string()))?;

    Ok(Duration::from_secs(secs.max(MIN_SUB_TIMEOUT_SECS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_single_url() {
        let urls = parse_callback("<http://client:9000/cb>").unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "http://client:9000/cb");
    }

    #[test]
    fn test_parse_callback_preserves_preference_order() {
        let urls =
            parse_callback("<http://a:9000/cb><http://b:9001/cb>").unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].host_str(), Some("a"));
        assert_eq!(urls[1].host_str(), Some("b"));
    }

    #[test]
    fn test_parse_callback_rejects_malformed() {
        assert!(parse_callback("").is_err());
        assert!(parse_callback("http://no-brackets:9000/cb").is_err());
        assert!(parse_callback("<not a url>").is_err());
        assert!(parse_callback("<http://ok:1/cb>trailing").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(
            parse_timeout("Second-3600").unwrap(),
            Duration::from_secs(3600)
        );
        // minimum imposé
        assert_eq!(
            parse_timeout("Second-60").unwrap(),
            Duration::from_secs(1800)
        );
        // champ absent : minimum
        assert_eq!(parse_timeout("").unwrap(), Duration::from_secs(1800));
        assert!(parse_timeout("3600").is_err());
        assert!(parse_timeout("Second-abc").is_err());
    }

    #[tokio::test]
    async fn test_initial_sequence_is_zero() {
        let sub = Subscription::new(Uuid::new_v4(), Vec::new(), Vec::new());
        assert_eq!(*sub.sequence.lock().await, 0);
        // aucune URL : rien n'est livré, la séquence n'avance pas
        sub.send_event().await;
        assert_eq!(*sub.sequence.lock().await, 0);
    }
}

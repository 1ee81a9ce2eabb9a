//! # Module Events - Eventing UPnP
//!
//! Ce module implémente l'eventing de l'UPnP Device Architecture 2.0, sous
//! ses deux formes : les NOTIFY multicast (variables `multicast="yes"`) et
//! les NOTIFY unicast vers les abonnés (variables `sendEvents="yes"`).
//!
//! ## Architecture
//!
//! Trois rôles concurrents sur un état partagé :
//!
//! - **Listener** : reçoit les notifications de changement sur le canal
//!   borné alimenté par les setters, et les accumule sous verrou.
//! - **Dispatcher** : toutes les 200 ms, draine atomiquement les changements
//!   accumulés, déduplique par variable, puis fan-out multicast et abonnés.
//! - **Timers d'abonnement** : chaque abonnement expire seul à son timeout.
//!
//! ## Garanties d'ordre
//!
//! - SEQ strictement croissant par abonnement (émission sérialisée par
//!   abonnement, premier message à SEQ 0).
//! - Clé SEQ multicast monotone par moteur, pas par variable.
//! - Un changement accumulé au tick T part au plus tard au tick T+1.

mod multicast;
mod subscriptions;

use std::collections::{HashMap, HashSet};
use std::net::SocketAddrV4;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use tracing::{info, trace};

pub use subscriptions::{parse_callback, parse_timeout, Subscription};

use crate::ids::BootId;
use crate::network::{self, Interface};
use crate::state_variables::{ChangeReceiver, StateVariable};

/// Période du dispatcher.
pub const EVENT_INTERVAL: Duration = Duration::from_millis(200);

/// Timeout minimal d'un abonnement, en secondes, selon l'UPnP Device
/// Architecture 2.0.
pub const MIN_SUB_TIMEOUT_SECS: u64 = 1800;

/// Adresse multicast de l'eventing.
pub const EVENT_MULTICAST_ADDR: &str = "239.255.255.246:7900";

/// Adresse multicast de l'eventing décodée.
pub static EVENT_GROUP: Lazy<SocketAddrV4> =
    Lazy::new(|| EVENT_MULTICAST_ADDR.parse().expect("invalid event group"));

#[derive(Error, Debug)]
pub enum EventingError {
    #[error("No subscription with uuid:{0} found")]
    UnknownSid(Uuid),

    #[error("Callback malformatted: {0}")]
    MalformedCallback(String),

    #[error("Timeout malformatted: {0}")]
    MalformedTimeout(String),
}

/// Moteur d'eventing multicast et par abonnement.
pub struct Eventing {
    /// clé SEQ des NOTIFY multicast, monotone par moteur
    key: AtomicU32,
    changes: Mutex<Vec<Arc<StateVariable>>>,
    subs: Mutex<HashMap<Uuid, Arc<Subscription>>>,
    interfaces: Vec<Interface>,
    boot_id: Arc<BootId>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
    dispatcher_task: Mutex<Option<JoinHandle<()>>>,
}

impl Eventing {
    /// Crée le moteur. `wanted` est la liste des interfaces configurées
    /// (vide : toutes les interfaces utilisables).
    pub fn new(wanted: &[String], boot_id: Arc<BootId>) -> std::io::Result<Self> {
        let interfaces = network::interfaces(wanted)?;
        Ok(Self {
            key: AtomicU32::new(0),
            changes: Mutex::new(Vec::new()),
            subs: Mutex::new(HashMap::new()),
            interfaces,
            boot_id,
            listener_task: Mutex::new(None),
            dispatcher_task: Mutex::new(None),
        })
    }

    /// Démarre le listener : accumule les changements reçus sur `rx`. Sa vie
    /// couvre toute celle du serveur, pas seulement les phases connectées.
    pub fn listen(self: &Arc<Self>, mut rx: ChangeReceiver, cancel: CancellationToken) {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            trace!("event listener started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        trace!("event listener stopped");
                        return;
                    }
                    received = rx.recv() => {
                        let Some(sv) = received else { return };
                        trace!("received change notification for '{}'", sv.name());
                        this.changes.lock().unwrap().push(sv);
                    }
                }
            }
        });
        if let Some(old) = self.listener_task.lock().unwrap().replace(task) {
            old.abort();
        }
    }

    /// Démarre le dispatcher périodique.
    pub fn run(self: &Arc<Self>, cancel: CancellationToken) {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(EVENT_INTERVAL);
            trace!("eventing running");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        trace!("eventing stopped");
                        return;
                    }
                    _ = ticker.tick() => this.dispatch().await,
                }
            }
        });
        if let Some(old) = self.dispatcher_task.lock().unwrap().replace(task) {
            old.abort();
        }
    }

    /// Arrête le dispatcher (son token doit déjà être annulé). Les
    /// changements non drainés sont abandonnés.
    pub async fn stop(&self) {
        let task = self.dispatcher_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.changes.lock().unwrap().clear();
    }

    /// Arrête le listener (son token doit déjà être annulé).
    pub async fn stop_listener(&self) {
        let task = self.listener_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Un tick du dispatcher : drainage atomique, déduplication par
    /// variable, puis fan-out.
    async fn dispatch(self: &Arc<Self>) {
        let drained: Vec<Arc<StateVariable>> =
            std::mem::take(&mut *self.changes.lock().unwrap());
        if drained.is_empty() {
            return;
        }

        // déduplication : une variable changée plusieurs fois dans la même
        // fenêtre ne part qu'une fois, avec sa dernière valeur
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut deduped: Vec<Arc<StateVariable>> = Vec::new();
        for sv in drained.into_iter().rev() {
            let key = (sv.service_id().to_string(), sv.name().to_string());
            if seen.insert(key) {
                deduped.push(sv);
            }
        }
        deduped.reverse();

        let to_multicast: Vec<_> = deduped
            .iter()
            .filter(|sv| sv.to_be_multicasted())
            .cloned()
            .collect();
        let to_event: Vec<_> = deduped
            .iter()
            .filter(|sv| sv.to_be_evented())
            .cloned()
            .collect();

        for sv in to_multicast {
            let key = self.key.fetch_add(1, Ordering::AcqRel);
            let interfaces = self.interfaces.clone();
            let boot_id = self.boot_id.val();
            tokio::spawn(async move {
                multicast::broadcast(key, sv, &interfaces, boot_id).await;
            });
        }

        if !to_event.is_empty() {
            let subs: Vec<Arc<Subscription>> =
                self.subs.lock().unwrap().values().cloned().collect();
            for sub in subs {
                sub.send_event().await;
            }
        }
    }

    /// Ajoute un abonnement et envoie son événement initial (SEQ 0, toutes
    /// les variables événementielles). Retourne le SID attribué.
    pub async fn add_sub(
        self: &Arc<Self>,
        duration: Duration,
        urls: Vec<Url>,
        state_vars: Vec<Arc<StateVariable>>,
    ) -> Uuid {
        let sid = Uuid::new_v4();
        let sub = Arc::new(Subscription::new(sid, urls, state_vars));

        // l'abonnement expire seul à son timeout
        let this = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(evt) = this.upgrade() {
                if evt.remove_sub(sid).is_ok() {
                    trace!("removed subscription {} due to timeout", sid);
                }
            }
        });
        sub.arm_timer(timer);

        self.subs.lock().unwrap().insert(sid, Arc::clone(&sub));

        // événement initial, envoyé avant de rendre la main
        sub.send_event().await;

        info!("🔒 added subscription {}", sid);
        sid
    }

    /// Renouvelle un abonnement : repart pour `duration`.
    pub fn renew_sub(self: &Arc<Self>, sid: Uuid, duration: Duration) -> Result<(), EventingError> {
        let subs = self.subs.lock().unwrap();
        let sub = subs.get(&sid).ok_or(EventingError::UnknownSid(sid))?;

        let this = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(evt) = this.upgrade() {
                if evt.remove_sub(sid).is_ok() {
                    trace!("removed subscription {} due to timeout", sid);
                }
            }
        });
        sub.arm_timer(timer);

        info!("♻️ subscription {} renewed", sid);
        Ok(())
    }

    /// Supprime un abonnement.
    pub fn remove_sub(&self, sid: Uuid) -> Result<(), EventingError> {
        let mut subs = self.subs.lock().unwrap();
        let sub = subs.remove(&sid).ok_or(EventingError::UnknownSid(sid))?;
        sub.disarm_timer();
        info!("❌ removed subscription {}", sid);
        Ok(())
    }

    /// Supprime tous les abonnements (arrêt du serveur).
    pub fn remove_all_subs(&self) {
        let mut subs = self.subs.lock().unwrap();
        for (_, sub) in subs.drain() {
            sub.disarm_timer();
        }
        trace!("all subscriptions removed");
    }

    /// Nombre d'abonnements actifs.
    pub fn sub_count(&self) -> usize {
        self.subs.lock().unwrap().len()
    }

    /// Clé SEQ multicast courante (la prochaine clé émise).
    pub fn multicast_key(&self) -> u32 {
        self.key.load(Ordering::Acquire)
    }
}

/// Corps XML canonique d'un propertyset d'événement.
pub(crate) fn marshal_state_vars(svs: &[Arc<StateVariable>]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\"?>");
    xml.push_str("<e:propertyset xmlns:e=\"urn:schemas-upnp-org:event-1-0\">");
    for sv in svs {
        xml.push_str("<e:property>");
        xml.push_str(&format!("<{0}>{1}</{0}>", sv.name(), sv.value_string()));
        xml.push_str("</e:property>");
    }
    xml.push_str("</e:propertyset>\r\n");
    xml
}

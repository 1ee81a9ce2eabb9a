//! Serveur SSDP par interface : annonces et réponses aux recherches.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::ids::{BootId, ConfigId};
use crate::network::{self, Interface, UDP_MSG_REPETITIONS};
use crate::ssdp::{search, DiscoveryData, SearchIndex, SSDP_GROUP};

/// Serveur SSDP d'une interface réseau.
///
/// Cycle de vie : créé, puis connecté ([`connect`](Self::connect)) ce qui
/// démarre les deux tâches coopératives (notifier et responder) sur le même
/// socket multicast, puis déconnecté ([`disconnect`](Self::disconnect)) ce
/// qui arrête les tâches et émet la rafale de byebye.
pub struct SsdpServer {
    data: Arc<DiscoveryData>,
    index: Arc<SearchIndex>,
    boot_id: Arc<BootId>,
    config_id: Arc<ConfigId>,
    iface: Interface,
    /// adresse substituée à `{{ADDRESS}}` dans l'URL de description
    addr: String,
    socket: Option<Arc<UdpSocket>>,
    cancel: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl SsdpServer {
    /// Crée un serveur SSDP pour une interface. `port` est le port HTTP du
    /// serveur de descriptions (0 : omis de l'adresse).
    pub fn new(
        data: Arc<DiscoveryData>,
        index: Arc<SearchIndex>,
        boot_id: Arc<BootId>,
        config_id: Arc<ConfigId>,
        iface: Interface,
        port: u16,
    ) -> Self {
        let addr = if port != 0 {
            format!("{}:{}", iface.addr, port)
        } else {
            iface.addr.to_string()
        };

        Self {
            data,
            index,
            boot_id,
            config_id,
            iface,
            addr,
            socket: None,
            cancel: None,
            tasks: Vec::new(),
        }
    }

    pub fn interface_name(&self) -> &str {
        &self.iface.name
    }

    /// Connecte le serveur : joint le groupe multicast et démarre les tâches
    /// de notification et de réponse.
    pub fn connect(&mut self) -> std::io::Result<()> {
        let socket = Arc::new(network::multicast_udp_socket(self.iface.addr, *SSDP_GROUP)?);
        self.socket = Some(Arc::clone(&socket));

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        self.tasks.push(tokio::spawn(notify_loop(
            Arc::clone(&self.data),
            Arc::clone(&self.boot_id),
            Arc::clone(&self.config_id),
            Arc::clone(&socket),
            self.addr.clone(),
            self.iface.name.clone(),
            cancel.clone(),
        )));
        self.tasks.push(tokio::spawn(respond_loop(
            Arc::clone(&self.data),
            Arc::clone(&self.index),
            Arc::clone(&self.boot_id),
            Arc::clone(&self.config_id),
            Arc::clone(&socket),
            self.addr.clone(),
            self.iface.name.clone(),
            cancel,
        )));

        info!("✅ SSDP server connected on interface '{}'", self.iface.name);
        Ok(())
    }

    /// Déconnecte le serveur : arrête les deux tâches puis émet la rafale de
    /// byebye.
    pub async fn disconnect(&mut self) {
        let Some(cancel) = self.cancel.take() else {
            return;
        };
        cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        if let Some(socket) = self.socket.take() {
            send_byebye(&self.data, &self.boot_id, &self.config_id, &socket).await;
        }

        info!(
            "👋 SSDP server disconnected on interface '{}'",
            self.iface.name
        );
    }
}

fn random_nap_ms(max: u64) -> Duration {
    Duration::from_millis(rand::rng().random_range(0..=max))
}

/// Tâche de notification : rafale alive initiale, puis ré-annonces à
/// intervalle aléatoire strictement inférieur à MaxAge/2.
async fn notify_loop(
    data: Arc<DiscoveryData>,
    boot_id: Arc<BootId>,
    config_id: Arc<ConfigId>,
    socket: Arc<UdpSocket>,
    addr: String,
    iface: String,
    cancel: CancellationToken,
) {
    tokio::time::sleep(random_nap_ms(1000)).await;
    send_alive(&data, &boot_id, &config_id, &socket, &addr, &iface).await;

    loop {
        // « at a randomly-distributed interval of less than one half of the
        // advertisement expiration time »
        let half_max_age_ms = ((data.max_age as u64) * 500).max(1);
        let period = Duration::from_millis(rand::rng().random_range(0..half_max_age_ms));
        tokio::select! {
            _ = cancel.cancelled() => {
                trace!("notify stopped on interface '{}'", iface);
                return;
            }
            _ = tokio::time::sleep(period) => {
                send_alive(&data, &boot_id, &config_id, &socket, &addr, &iface).await;
            }
        }
    }
}

async fn send_alive(
    data: &DiscoveryData,
    boot_id: &BootId,
    config_id: &ConfigId,
    socket: &UdpSocket,
    addr: &str,
    iface: &str,
) {
    for _ in 0..UDP_MSG_REPETITIONS {
        tokio::time::sleep(random_nap_ms(1000)).await;
        for asset in &data.assets {
            let mut msg = String::new();
            msg.push_str("NOTIFY * HTTP/1.1\r\n");
            msg.push_str(&format!("HOST: {}\r\n", *SSDP_GROUP));
            msg.push_str(&format!("NT: {}\r\n", asset.nt));
            msg.push_str("NTS: ssdp:alive\r\n");
            msg.push_str(&format!("USN: {}\r\n", asset.usn));
            msg.push_str(&format!(
                "LOCATION: {}\r\n",
                data.location.replace("{{ADDRESS}}", addr)
            ));
            msg.push_str(&format!("CACHE-CONTROL: max-age={}\r\n", data.max_age));
            msg.push_str(&format!("BOOTID.UPNP.ORG: {}\r\n", boot_id.val()));
            msg.push_str(&format!("CONFIG.UPNP.ORG: {}\r\n", config_id.val()));
            msg.push_str("\r\n");

            if let Err(e) =
                network::send_udp(socket, SocketAddr::V4(*SSDP_GROUP), msg.as_bytes()).await
            {
                warn!("❌ failed to send alive for {}: {}", asset.usn, e);
            }
        }
    }
    trace!("sent alive messages on interface '{}'", iface);
}

async fn send_byebye(
    data: &DiscoveryData,
    boot_id: &BootId,
    config_id: &ConfigId,
    socket: &UdpSocket,
) {
    for _ in 0..UDP_MSG_REPETITIONS {
        tokio::time::sleep(random_nap_ms(1000)).await;
        for asset in &data.assets {
            let mut msg = String::new();
            msg.push_str("NOTIFY * HTTP/1.1\r\n");
            msg.push_str(&format!("HOST: {}\r\n", *SSDP_GROUP));
            msg.push_str(&format!("NT: {}\r\n", asset.nt));
            msg.push_str("NTS: ssdp:byebye\r\n");
            msg.push_str(&format!("USN: {}\r\n", asset.usn));
            msg.push_str(&format!("BOOTID.UPNP.ORG: {}\r\n", boot_id.val()));
            msg.push_str(&format!("CONFIG.UPNP.ORG: {}\r\n", config_id.val()));
            msg.push_str("\r\n");

            if let Err(e) =
                network::send_udp(socket, SocketAddr::V4(*SSDP_GROUP), msg.as_bytes()).await
            {
                warn!("❌ failed to send byebye for {}: {}", asset.usn, e);
            }
        }
    }
}

/// Tâche de réponse : réception bloquante sur le socket multicast, chaque
/// datagramme pertinent est traité dans une tâche dédiée pour ne pas bloquer
/// la lecture des suivants.
#[allow(clippy::too_many_arguments)]
async fn respond_loop(
    data: Arc<DiscoveryData>,
    index: Arc<SearchIndex>,
    boot_id: Arc<BootId>,
    config_id: Arc<ConfigId>,
    socket: Arc<UdpSocket>,
    addr: String,
    iface: String,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; 8192];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                trace!("response stopped on interface '{}'", iface);
                return;
            }
            received = socket.recv_from(&mut buf) => {
                let (n, req_addr) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("❌ SSDP read error on '{}': {}", iface, e);
                        continue;
                    }
                };
                if n == 0 {
                    continue;
                }
                let msg = String::from_utf8_lossy(&buf[..n]).to_string();
                // requête mal formée ou sans correspondance : silence imposé
                let Some(req) = search::analyze(&msg, &index) else {
                    continue;
                };
                trace!(
                    "search request from {} for {} on interface '{}' is relevant",
                    req_addr, req.st, iface
                );

                let data = Arc::clone(&data);
                let index = Arc::clone(&index);
                let boot_id = Arc::clone(&boot_id);
                let config_id = Arc::clone(&config_id);
                let socket = Arc::clone(&socket);
                let addr = addr.clone();
                let iface = iface.clone();
                tokio::spawn(async move {
                    respond(&data, &index, &boot_id, &config_id, &socket, &addr, &iface, req, req_addr)
                        .await;
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn respond(
    data: &DiscoveryData,
    index: &SearchIndex,
    boot_id: &BootId,
    config_id: &ConfigId,
    socket: &UdpSocket,
    addr: &str,
    iface: &str,
    req: search::SearchRequest,
    req_addr: SocketAddr,
) {
    let msgs = search::assemble_responses(data, index, addr, &req, boot_id, config_id);
    if msgs.is_empty() {
        return;
    }

    if req.tcp_port != 0 {
        // réponses par TCP : un seul message, USN joints par des virgules
        let target = format!("{}:{}", req_addr.ip(), req.tcp_port);
        if let Err(e) = network::send_tcp(&target, msgs[0].as_bytes()).await {
            warn!("❌ couldn't send SSDP search response to {}: {}", target, e);
        }
    } else {
        // réponses par UDP, étalées sur MX secondes
        let spacing = Duration::from_secs(req.mx) / (msgs.len() as u32 + 1);
        for (i, msg) in msgs.iter().enumerate() {
            if i != 0 {
                tokio::time::sleep(spacing).await;
            }
            if let Err(e) = network::send_udp(socket, req_addr, msg.as_bytes()).await {
                warn!("❌ couldn't send SSDP search response to {}: {}", req_addr, e);
            }
        }
    }

    info!(
        "📡 responded to search request from {} for {} on interface '{}'",
        req_addr.ip(),
        req.st,
        iface
    );
}

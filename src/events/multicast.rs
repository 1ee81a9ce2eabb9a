//! Émission des NOTIFY multicast d'événements.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{trace, warn};

use crate::events::{marshal_state_vars, EVENT_GROUP, EVENT_MULTICAST_ADDR};
use crate::network::{self, Interface, UDP_MSG_REPETITIONS};
use crate::state_variables::StateVariable;

/// Diffuse l'événement d'une variable sur toutes les interfaces, en trois
/// passes espacées de pauses aléatoires (première passe immédiate).
pub(crate) async fn broadcast(
    key: u32,
    sv: Arc<StateVariable>,
    interfaces: &[Interface],
    boot_id: u32,
) {
    trace!("broadcasting state variable '{}' with key {}", sv.name(), key);

    let body = marshal_state_vars(std::slice::from_ref(&sv));

    let mut msg = String::new();
    msg.push_str("NOTIFY * HTTP/1.1\r\n");
    msg.push_str(&format!("HOST: {}\r\n", EVENT_MULTICAST_ADDR));
    msg.push_str("CONTENT-TYPE: text/xml; charset=\"utf-8\"\r\n");
    msg.push_str(&format!(
        "USN: {}::{}:{}\r\n",
        sv.device_udn(),
        sv.service_type(),
        sv.service_version()
    ));
    msg.push_str(&format!("SVCID: {}\r\n", sv.service_id()));
    msg.push_str("NT: upnp:event\r\n");
    msg.push_str("NTS: upnp:propchange\r\n");
    msg.push_str(&format!("SEQ: {}\r\n", key));
    msg.push_str("LVL: upnp:/info\r\n");
    msg.push_str(&format!("BOOTID.UPNP.ORG: {}\r\n", boot_id));
    msg.push_str(&format!("CONTENT-LENGTH: {}\r\n", body.len()));
    msg.push_str("\r\n");
    msg.push_str(&body);
    msg.push_str("\r\n");

    for i in 0..UDP_MSG_REPETITIONS {
        if i != 0 {
            let nap = Duration::from_millis(rand::rng().random_range(0..=500));
            tokio::time::sleep(nap).await;
        }
        for iface in interfaces {
            let socket = match network::multicast_udp_socket(iface.addr, *EVENT_GROUP) {
                Ok(s) => s,
                Err(e) => {
                    warn!(
                        "could not create connection for multicast eventing on '{}': {}",
                        iface.name, e
                    );
                    continue;
                }
            };
            if let Err(e) =
                network::send_udp(&socket, SocketAddr::V4(*EVENT_GROUP), msg.as_bytes()).await
            {
                warn!("could not send multicast event on '{}': {}", iface.name, e);
            }
        }
    }

    trace!("broadcasted state variable '{}' with key {}", sv.name(), key);
}

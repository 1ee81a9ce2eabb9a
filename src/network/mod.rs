//! # Module Network - Plomberie réseau SSDP et eventing
//!
//! Énumération des interfaces utilisables, construction des sockets UDP
//! multicast et envoi TCP one-shot. Les moteurs SSDP et d'événements ne
//! touchent jamais socket2 ou nix directement : tout passe par ici.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use nix::net::if_::InterfaceFlags;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tracing::{error, warn};

/// Nombre de répétitions des messages UDP de découverte et d'événement.
/// L'UPnP Device Architecture 2.0 autorise jusqu'à trois envois.
pub const UDP_MSG_REPETITIONS: usize = 3;

/// Interface réseau utilisable : up, non loopback, avec une adresse IPv4.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub addr: Ipv4Addr,
}

/// Énumère les interfaces utilisables.
///
/// Si `wanted` est non vide, seules les interfaces de ces noms sont
/// retenues ; sinon toutes les interfaces de la machine sont candidates.
pub fn interfaces(wanted: &[String]) -> io::Result<Vec<Interface>> {
    let mut result: Vec<Interface> = Vec::new();

    for ifaddr in nix::ifaddrs::getifaddrs()? {
        if !ifaddr.flags.contains(InterfaceFlags::IFF_UP)
            || ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK)
        {
            continue;
        }
        if !wanted.is_empty() && !wanted.iter().any(|w| *w == ifaddr.interface_name) {
            continue;
        }
        // une seule entrée par interface, sur sa première adresse IPv4
        if result.iter().any(|i| i.name == ifaddr.interface_name) {
            continue;
        }

        let Some(addr) = ifaddr.address.as_ref().and_then(|a| a.as_sockaddr_in()) else {
            continue;
        };

        result.push(Interface {
            name: ifaddr.interface_name.clone(),
            addr: addr.ip(),
        });
    }

    if !wanted.is_empty() {
        for name in wanted {
            if !result.iter().any(|i| i.name == *name) {
                warn!("configured interface '{}' is not usable", name);
            }
        }
    }

    Ok(result)
}

/// Construit un socket UDP multicast lié au port du groupe et joint au
/// groupe sur l'interface donnée. TTL 2, loopback actif.
pub fn multicast_udp_socket(
    iface_addr: Ipv4Addr,
    group: SocketAddrV4,
) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port())).into())?;
    socket.join_multicast_v4(group.ip(), &iface_addr)?;
    socket.set_multicast_if_v4(&iface_addr)?;
    socket.set_multicast_ttl_v4(2)?;
    socket.set_multicast_loop_v4(true)?;
    socket.set_nonblocking(true)?;

    UdpSocket::from_std(socket.into())
}

/// Envoie un datagramme. L'envoi incomplet est traité comme une erreur.
pub async fn send_udp(socket: &UdpSocket, addr: SocketAddr, msg: &[u8]) -> io::Result<()> {
    let n = socket.send_to(msg, addr).await?;
    if n != msg.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("incomplete write to UDP socket: {}/{} bytes", n, msg.len()),
        ));
    }
    Ok(())
}

/// Ouvre une connexion TCP, écrit le message et ferme la connexion.
pub async fn send_tcp(addr: &str, msg: &[u8]) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr).await.map_err(|e| {
        error!("cannot create TCP connection to {}: {}", addr, e);
        e
    })?;
    stream.write_all(msg).await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interfaces_enumerates_without_error() {
        // le contenu dépend de la machine, mais l'appel doit aboutir et ne
        // jamais retourner le loopback
        let infs = interfaces(&[]).unwrap();
        assert!(infs.iter().all(|i| i.name != "lo"));
    }

    #[test]
    fn test_unknown_wanted_interface_yields_empty() {
        let infs = interfaces(&["does-not-exist-0".to_string()]).unwrap();
        assert!(infs.is_empty());
    }
}

use get_if_addrs::{IfAddr, get_if_addrs};
use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use tracing::trace;

/// Interface réseau utilisable pour SSDP.
///
/// Seules les interfaces IPv4, actives, non-loopback et capables de
/// multicast sont retenues par [`available_interfaces`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetInterface {
    /// Nom système de l'interface (ex: `"eth0"`, `"en0"`)
    pub name: String,
    /// Adresse IPv4 de l'interface
    pub address: Ipv4Addr,
}

impl NetInterface {
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

impl fmt::Display for NetInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Indique si une adresse textuelle est une adresse IPv6.
///
/// Une adresse est considérée IPv6 dès qu'elle contient `:` après le
/// premier caractère.
pub fn is_ipv6_address(addr: &str) -> bool {
    matches!(addr.find(':'), Some(idx) if idx > 0)
}

/// Liste les interfaces utilisables pour SSDP.
///
/// Une interface est retenue si elle n'est pas loopback, qu'elle est
/// active, qu'elle supporte le multicast et qu'elle porte une adresse
/// IPv4. Les interfaces portant plusieurs adresses IPv4 ne sont
/// listées qu'une fois, avec la première adresse rencontrée.
///
/// # Errors
///
/// Retourne une erreur `NotFound` si aucune interface n'est utilisable.
pub fn available_interfaces() -> io::Result<Vec<NetInterface>> {
    let flags = interface_flags()?;
    let mut interfaces: Vec<NetInterface> = Vec::new();

    for iface in get_if_addrs()? {
        if iface.is_loopback() {
            continue;
        }

        let address = match &iface.addr {
            IfAddr::V4(v4) => v4.ip,
            IfAddr::V6(_) => continue,
        };

        if let Some(state) = flags.get(&iface.name) {
            if !state.up || !state.multicast {
                trace!(interface = %iface.name, "skipping interface (down or no multicast)");
                continue;
            }
        }

        if interfaces.iter().any(|known| known.name == iface.name) {
            continue;
        }

        interfaces.push(NetInterface::new(iface.name, address));
    }

    if interfaces.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "available interface not found",
        ));
    }

    Ok(interfaces)
}

/// Compte les blocs d'adresse identiques en tête de deux adresses pointées.
///
/// Retourne `None` si les adresses n'ont pas le même nombre de blocs.
pub fn match_address_block_count(if_addr: &str, target_addr: &str) -> Option<usize> {
    let target_blocks: Vec<&str> = target_addr.split('.').collect();
    let if_blocks: Vec<&str> = if_addr.split('.').collect();

    if target_blocks.len() != if_blocks.len() {
        return None;
    }

    let matched = target_blocks
        .iter()
        .zip(if_blocks.iter())
        .take_while(|(target, local)| target == local)
        .count();

    Some(matched)
}

/// Choisit l'interface la plus proche d'une adresse distante.
pub fn interface_for_addr(from_addr: &str) -> io::Result<NetInterface> {
    select_interface_for_addr(available_interfaces()?, from_addr)
}

/// Choisit parmi `interfaces` celle dont l'adresse partage le plus long
/// préfixe (bloc par bloc) avec `from_addr`. À égalité, la première
/// interface rencontrée est conservée.
pub fn select_interface_for_addr(
    interfaces: Vec<NetInterface>,
    from_addr: &str,
) -> io::Result<NetInterface> {
    let mut candidates = interfaces.into_iter();
    let Some(first) = candidates.next() else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "available interface not found",
        ));
    };

    let score = |iface: &NetInterface| {
        match_address_block_count(&iface.address.to_string(), from_addr)
            .map(|n| n as isize)
            .unwrap_or(-1)
    };

    let mut best_score = score(&first);
    let mut best = first;
    for iface in candidates {
        let current = score(&iface);
        if current > best_score {
            best_score = current;
            best = iface;
        }
    }

    Ok(best)
}

#[derive(Debug, Clone, Copy)]
struct InterfaceState {
    up: bool,
    multicast: bool,
}

impl InterfaceState {
    #[cfg(unix)]
    fn from_flags(flags: u32) -> Self {
        Self {
            up: flags & (libc::IFF_UP as u32) != 0,
            multicast: flags & (libc::IFF_MULTICAST as u32) != 0,
        }
    }
}

/// États `IFF_UP` / `IFF_MULTICAST` de chaque interface, indexés par nom.
///
/// `get_if_addrs` n'expose pas ces drapeaux ; ils sont lus ici via
/// `getifaddrs(3)`. C'est le seul bloc `unsafe` de la crate.
#[cfg(unix)]
fn interface_flags() -> io::Result<std::collections::HashMap<String, InterfaceState>> {
    use std::collections::HashMap;
    use std::ffi::CStr;

    let mut states = HashMap::new();
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();

    // SAFETY: `head` n'est lu que si getifaddrs a réussi. Chaque noeud de
    // la liste, et la chaîne `ifa_name` qu'il porte, reste valide jusqu'à
    // l'unique appel à freeifaddrs qui clôt le bloc ; aucune référence
    // n'en sort (les noms sont copiés dans des `String`).
    unsafe {
        if libc::getifaddrs(&mut head) != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut cursor = head;
        while let Some(entry) = cursor.as_ref() {
            if !entry.ifa_name.is_null() {
                let name = CStr::from_ptr(entry.ifa_name)
                    .to_string_lossy()
                    .into_owned();
                states.insert(name, InterfaceState::from_flags(entry.ifa_flags as u32));
            }
            cursor = entry.ifa_next;
        }

        libc::freeifaddrs(head);
    }

    Ok(states)
}

#[cfg(not(unix))]
fn interface_flags() -> io::Result<std::collections::HashMap<String, InterfaceState>> {
    Ok(std::collections::HashMap::new())
}

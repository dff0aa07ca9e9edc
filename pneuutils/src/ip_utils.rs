use get_if_addrs::get_if_addrs;
use std::collections::BTreeMap;
use std::net::UdpSocket;

/// Devine l'adresse IP locale de la machine.
///
/// Un socket UDP est « connecté » vers un résolveur public : aucun paquet n'est
/// émis, mais le système choisit l'interface de sortie, dont on lit l'adresse.
/// Retourne `"127.0.0.1"` en cas d'échec.
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Liste les adresses IPv4 non-loopback, groupées par interface.
///
/// Les interfaces sont triées par nom pour un affichage stable dans les logs.
/// Retourne une table vide si les interfaces ne peuvent pas être lues.
pub fn list_all_ips() -> BTreeMap<String, Vec<String>> {
    let mut result = BTreeMap::new();

    if let Ok(interfaces) = get_if_addrs() {
        for iface in interfaces {
            let ip = iface.ip();
            if ip.is_loopback() || !ip.is_ipv4() {
                continue;
            }
            let entry: &mut Vec<String> = result.entry(iface.name).or_default();
            let ip = ip.to_string();
            if !entry.contains(&ip) {
                entry.push(ip);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::net::IpAddr;

    #[test]
    fn test_guess_local_ip_returns_valid_ipv4() {
        let ip = guess_local_ip();

        let parsed = ip.parse::<IpAddr>();
        assert!(parsed.is_ok(), "Should return a valid IP address");
        assert!(parsed.unwrap().is_ipv4());
    }

    #[test]
    fn test_list_all_ips_filters_loopback_and_ipv6() {
        for (_, addresses) in list_all_ips() {
            for addr in addresses {
                let parsed = addr.parse::<IpAddr>().unwrap();
                assert!(!parsed.is_loopback());
                assert!(parsed.is_ipv4());
            }
        }
    }

    #[test]
    fn test_list_all_ips_no_duplicates() {
        for (iface, addresses) in list_all_ips() {
            assert!(!iface.is_empty());
            let unique: HashSet<_> = addresses.iter().collect();
            assert_eq!(unique.len(), addresses.len());
        }
    }
}

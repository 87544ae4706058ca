use std::str::FromStr;

use alloy::primitives::Address;
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::debug;

use crate::constants::{CHALLENGE_FACTORY, GLOBAL_INBOX, ROLLUP_TEMPLATE};
use crate::factory::{FactoryAddresses, View};

/// One `### Heading` section of a deployment table.
#[derive(Debug, Default)]
pub struct Network {
    pub name: String,
    pub contracts: Vec<(String, Address)>,
}

impl Network {
    /// Row names compare case-insensitively.
    pub fn address_of(&self, contract_name: &str) -> Option<Address> {
        self.contracts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(contract_name))
            .map(|(_, address)| *address)
    }
}

/// Outcome of comparing one factory getter against the deployment table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Match(Address),
    Mismatch { expected: Address, on_chain: Address },
    Missing,
}

/// Parses `### Network` headings followed by `| Name | [0x...](link) |` rows.
/// Repeated headings extend the earlier section.
pub fn parse_networks(content: &str) -> Result<Vec<Network>> {
    let heading = Regex::new(r"^###\s+(?P<network>.+)")?;
    let row = Regex::new(r"\|\s*(?P<name>[^|]+?)\s*\|\s*\[(?P<address>0x[a-fA-F0-9]{40})\]")?;

    let mut networks: Vec<Network> = Vec::new();
    let mut current: Option<usize> = None;

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;

        if let Some(caps) = heading.captures(line) {
            let name = caps["network"].trim();
            current = Some(match networks.iter().position(|n| n.name == name) {
                Some(pos) => pos,
                None => {
                    networks.push(Network {
                        name: name.to_string(),
                        ..Default::default()
                    });
                    networks.len() - 1
                }
            });
            continue;
        }

        let Some(caps) = row.captures(line) else {
            continue;
        };
        let pos = current.ok_or_else(|| {
            anyhow!(
                "Found contract definition before network header on line {}",
                line_no
            )
        })?;
        let address = Address::from_str(&caps["address"])
            .with_context(|| format!("Invalid address on line {}", line_no))?;
        networks[pos]
            .contracts
            .push((caps["name"].trim().to_string(), address));
    }
    Ok(networks)
}

pub fn find_network<'a>(networks: &'a [Network], network_name: &str) -> Option<&'a Network> {
    networks.iter().find(|n| n.name == network_name)
}

/// Deployment table row that documents a given getter.
pub fn table_name(view: View) -> &'static str {
    match view {
        View::ChallengeFactoryAddress => CHALLENGE_FACTORY,
        View::GlobalInboxAddress => GLOBAL_INBOX,
        View::RollupTemplate => ROLLUP_TEMPLATE,
    }
}

/// Compares each getter against the table rows of `network_name`.
/// Fails only when the network itself is absent.
pub fn check_addresses(
    networks: &[Network],
    network_name: &str,
    on_chain: &FactoryAddresses,
) -> Result<Vec<(View, Check)>> {
    let network = find_network(networks, network_name)
        .ok_or_else(|| anyhow!("Network {} not found in deployment table", network_name))?;

    Ok(View::ALL
        .into_iter()
        .map(|view| {
            let actual = on_chain.get(view);
            let check = match network.address_of(table_name(view)) {
                None => Check::Missing,
                Some(expected) if expected == actual => Check::Match(actual),
                Some(expected) => Check::Mismatch {
                    expected,
                    on_chain: actual,
                },
            };
            debug!(%view, ?check, "checked factory getter");
            (view, check)
        })
        .collect())
}

pub fn report(network_name: &str, checks: &[(View, Check)]) -> bool {
    let mut all_checks_passed = true;
    for (view, check) in checks {
        match check {
            Check::Match(_) => {}
            Check::Missing => {
                println!(
                    "Could not find expected address for {} in {}",
                    table_name(*view),
                    network_name
                );
                all_checks_passed = false;
            }
            Check::Mismatch { expected, on_chain } => {
                println!(
                    "❌ MISMATCH for {}: \n\tFile {}: {}\n\tChain {}: {}",
                    network_name, view, expected, view, on_chain
                );
                all_checks_passed = false;
            }
        }
    }

    if all_checks_passed {
        println!("✅ All factory addresses match for {}", network_name);
    }
    all_checks_passed
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
# Deployments

### Arbitrum Testnet
| Contract | Address |
|----------|---------|
| ChallengeFactory | [0x1111111111111111111111111111111111111111](https://example.org) |
| GlobalInbox | [0x2222222222222222222222222222222222222222](https://example.org) |
| RollupTemplate | [0x3333333333333333333333333333333333333333](https://example.org) |

### Local
| globalinbox | [0x4444444444444444444444444444444444444444]() |
";

    fn on_chain() -> FactoryAddresses {
        FactoryAddresses {
            challenge_factory: Address::repeat_byte(0x11),
            global_inbox: Address::repeat_byte(0x22),
            rollup_template: Address::repeat_byte(0x33),
        }
    }

    #[test]
    fn parses_networks_and_rows() {
        let networks = parse_networks(TABLE).unwrap();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].name, "Arbitrum Testnet");
        assert_eq!(networks[0].contracts.len(), 3);
        assert_eq!(
            networks[0].contracts[2],
            ("RollupTemplate".to_string(), Address::repeat_byte(0x33))
        );
    }

    #[test]
    fn lookup_ignores_case() {
        let networks = parse_networks(TABLE).unwrap();
        let local = find_network(&networks, "Local").unwrap();
        assert_eq!(
            local.address_of(GLOBAL_INBOX),
            Some(Address::repeat_byte(0x44))
        );
        assert!(local.address_of(ROLLUP_TEMPLATE).is_none());
        assert!(find_network(&networks, "Mainnet").is_none());
    }

    #[test]
    fn repeated_heading_extends_section() {
        let table = "\
### Local
| GlobalInbox | [0x4444444444444444444444444444444444444444] |
### Other
### Local
| RollupTemplate | [0x3333333333333333333333333333333333333333] |
";
        let networks = parse_networks(table).unwrap();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].contracts.len(), 2);
        assert!(networks[1].contracts.is_empty());
    }

    #[test]
    fn row_before_heading_is_an_error() {
        let err = parse_networks("| GlobalInbox | [0x4444444444444444444444444444444444444444] |")
            .unwrap_err();
        assert!(err.to_string().contains("before network header on line 1"));
    }

    #[test]
    fn matching_table_passes() {
        let networks = parse_networks(TABLE).unwrap();
        let checks = check_addresses(&networks, "Arbitrum Testnet", &on_chain()).unwrap();
        assert!(checks.iter().all(|(_, c)| matches!(c, Check::Match(_))));
        assert!(report("Arbitrum Testnet", &checks));
    }

    #[test]
    fn mismatches_and_gaps_fail() {
        let networks = parse_networks(TABLE).unwrap();
        let checks = check_addresses(&networks, "Local", &on_chain()).unwrap();
        assert_eq!(checks[0], (View::ChallengeFactoryAddress, Check::Missing));
        assert_eq!(
            checks[1],
            (
                View::GlobalInboxAddress,
                Check::Mismatch {
                    expected: Address::repeat_byte(0x44),
                    on_chain: Address::repeat_byte(0x22),
                }
            )
        );
        assert!(!report("Local", &checks));
    }

    #[test]
    fn unknown_network_is_an_error() {
        let networks = parse_networks(TABLE).unwrap();
        assert!(check_addresses(&networks, "Mainnet", &on_chain()).is_err());
    }
}

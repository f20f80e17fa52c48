//! Node/link tables for flow (Sankey) charts.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::wallet::{HoldingsSummary, WalletTransfer};
use crate::{shorten_address, WalletAddress};

const OTHER: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub label: String,
    /// The node stands for the queried wallet.
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowDiagram {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

/// `Amount In -> token -> {Amount Out, Current Holdings}` for every token
/// row; the total row is not drawn.
pub fn token_flow(holdings: &HoldingsSummary) -> FlowDiagram {
    let mut nodes = ["Amount In", "Amount Out", "Current Holdings"]
        .into_iter()
        .map(|label| FlowNode {
            label: label.to_owned(),
            highlight: false,
        })
        .collect::<Vec<_>>();
    let mut links = Vec::new();

    for row in &holdings.tokens {
        let index = nodes.len();
        nodes.push(FlowNode {
            label: row.token.clone(),
            highlight: false,
        });

        let edges = [
            (0, index, row.amount_in),
            (index, 1, row.amount_out),
            (index, 2, row.current_holdings),
        ];
        for (source, target, value) in edges {
            if value > 0.0 {
                links.push(FlowLink {
                    source,
                    target,
                    value,
                    count: 1,
                });
            }
        }
    }

    FlowDiagram { nodes, links }
}

/// Sender-to-receiver links between the `top_k` busiest addresses by
/// absolute value moved. Everyone else is folded into a single `Other`
/// node.
pub fn counterparty_flow(
    transfers: &[WalletTransfer],
    wallet: &WalletAddress,
    top_k: usize,
) -> FlowDiagram {
    let mut scores: HashMap<&str, f64> = HashMap::new();
    for transfer in transfers {
        *scores.entry(transfer.from.as_str()).or_default() += transfer.amount.abs();
        *scores.entry(transfer.to.as_str()).or_default() += transfer.amount.abs();
    }

    let mut ranked = scores.into_iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let kept = ranked
        .into_iter()
        .take(top_k)
        .map(|(address, _)| address)
        .collect::<Vec<_>>();
    let bucket = |address: &str| -> String {
        if kept.iter().any(|name| *name == address) {
            address.to_owned()
        } else {
            OTHER.to_owned()
        }
    };

    let edges = transfers
        .iter()
        .map(|transfer| (bucket(&transfer.from), bucket(&transfer.to), transfer.amount))
        .collect::<Vec<_>>();

    // Node order: senders first, then receivers, in order of appearance.
    let mut order: Vec<String> = Vec::new();
    for name in edges.iter().map(|e| &e.0).chain(edges.iter().map(|e| &e.1)) {
        if !order.contains(name) {
            order.push(name.clone());
        }
    }
    let index_of = order
        .iter()
        .enumerate()
        .map(|(index, name)| (name.clone(), index))
        .collect::<HashMap<_, _>>();

    let mut incoming: HashMap<&str, usize> = HashMap::new();
    let mut outgoing: HashMap<&str, usize> = HashMap::new();
    let mut aggregated: BTreeMap<(usize, usize), (f64, usize)> = BTreeMap::new();
    for (from, to, amount) in &edges {
        *outgoing.entry(from.as_str()).or_default() += 1;
        *incoming.entry(to.as_str()).or_default() += 1;
        if let (Some(&source), Some(&target)) = (index_of.get(from), index_of.get(to)) {
            let entry = aggregated.entry((source, target)).or_default();
            entry.0 += amount;
            entry.1 += 1;
        }
    }

    let nodes = order
        .iter()
        .map(|name| {
            let display = if name == OTHER {
                name.clone()
            } else {
                shorten_address(name)
            };
            FlowNode {
                label: format!(
                    "{display} - Incoming: {}, Outgoing: {}",
                    incoming.get(name.as_str()).copied().unwrap_or(0),
                    outgoing.get(name.as_str()).copied().unwrap_or(0)
                ),
                highlight: name == wallet.as_str(),
            }
        })
        .collect();

    let links = aggregated
        .into_iter()
        .map(|((source, target), (value, count))| FlowLink {
            source,
            target,
            value,
            count,
        })
        .collect();

    FlowDiagram { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::HoldingRow;
    use crate::UtcDateTime;

    fn address(last: u8) -> String {
        format!("0x{:040x}", last)
    }

    fn transfer(from: &str, to: &str, amount: f64) -> WalletTransfer {
        WalletTransfer {
            hash: String::from("0x1"),
            from: from.to_owned(),
            to: to.to_owned(),
            amount,
            timestamp: UtcDateTime::from_unix_seconds(0).expect("ts"),
            block_number: 1,
            token_name: None,
            token_symbol: None,
            method: Some("Transfer"),
            gas_price_gwei: 0.0,
        }
    }

    fn row(token: &str, amount_in: f64, amount_out: f64) -> HoldingRow {
        HoldingRow {
            token: token.to_owned(),
            amount_in,
            amount_out,
            current_holdings: amount_in - amount_out,
        }
    }

    #[test]
    fn token_flow_links_only_positive_amounts() {
        let summary = HoldingsSummary {
            tokens: vec![row("Tether USD", 100.0, 30.0), row("Pepe", 0.0, 5.0)],
            total: row("Total", 100.0, 35.0),
        };

        let diagram = token_flow(&summary);

        assert_eq!(diagram.nodes.len(), 5);
        assert_eq!(diagram.nodes[3].label, "Tether USD");
        let edges = diagram
            .links
            .iter()
            .map(|link| (link.source, link.target, link.value))
            .collect::<Vec<_>>();
        assert_eq!(edges, vec![(0, 3, 100.0), (3, 1, 30.0), (3, 2, 70.0), (4, 1, 5.0)]);
    }

    #[test]
    fn counterparty_flow_collapses_the_tail_into_other() {
        let wallet = WalletAddress::parse(&address(0xaa)).expect("wallet");
        let transfers = vec![
            transfer(&address(0xaa), &address(1), 10.0),
            transfer(&address(2), &address(0xaa), 5.0),
            transfer(&address(3), &address(0xaa), 0.5),
            transfer(&address(4), &address(0xaa), 0.25),
        ];

        let diagram = counterparty_flow(&transfers, &wallet, 3);

        let labels = diagram.nodes.iter().map(|n| n.label.as_str()).collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec![
                "0x0000...00aa - Incoming: 3, Outgoing: 1",
                "0x0000...0002 - Incoming: 0, Outgoing: 1",
                "Other - Incoming: 0, Outgoing: 2",
                "0x0000...0001 - Incoming: 1, Outgoing: 0",
            ]
        );
        assert!(diagram.nodes[0].highlight);
        let other_link = diagram
            .links
            .iter()
            .find(|link| link.source == 2)
            .expect("link from Other");
        assert_eq!(other_link.count, 2);
        assert_eq!(other_link.value, 0.75);
    }
}

//! Text and JSON report generation.
//!
//! The text report is Markdown so it reads fine on a terminal and renders
//! when saved to a `.md` file.

use crate::models::{
    AggregatedIdentity, ConnectionEntryList, FoundationSales, Report, ReportMetadata,
};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Identity Report: {}\n\n", report.metadata.address));

    output.push_str(&generate_metadata_section(&report.metadata));

    if let Some(identity) = &report.identity {
        output.push_str(&generate_identity_section(identity));
    }

    if let Some(connections) = &report.connections {
        output.push_str(&generate_connections_section(connections));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Address:** `{}`\n", metadata.address));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    if !metadata.lookups.is_empty() {
        section.push_str(&format!("- **Lookups:** {}\n", metadata.lookups.join(", ")));
    }
    section.push('\n');

    section
}

fn generate_identity_section(identity: &AggregatedIdentity) -> String {
    let mut section = String::new();

    section.push_str("## Identity\n\n");

    if identity.is_empty() {
        section.push_str("No identity data found for this address.\n\n");
        return section;
    }

    if let Some(ens) = &identity.ens {
        section.push_str(&format!("- **ENS:** {ens}\n\n"));
    }

    section.push_str(&generate_profile_list(
        "OpenSea",
        identity
            .opensea
            .iter()
            .map(|p| profile_line(&p.username, &[p.homepage.as_str()], &p.data_source.to_string())),
    ));
    section.push_str(&generate_profile_list(
        "Twitter",
        identity
            .twitter
            .iter()
            .map(|t| format!("@{} ({})", t.handle, t.data_source)),
    ));
    section.push_str(&generate_profile_list(
        "SuperRare",
        identity.superrare.iter().map(|p| {
            profile_line(
                &p.username,
                &[
                    p.homepage.as_str(),
                    p.website.as_str(),
                    p.location.as_str(),
                    p.twitter_link.as_str(),
                    p.instagram_link.as_str(),
                    p.steemit_link.as_str(),
                    p.spotify_link.as_str(),
                    p.soundcloud_link.as_str(),
                ],
                &p.data_source.to_string(),
            )
        }),
    ));
    section.push_str(&generate_profile_list(
        "Rarible",
        identity
            .rarible
            .iter()
            .map(|p| profile_line(&p.username, &[p.homepage.as_str()], &p.data_source.to_string())),
    ));
    section.push_str(&generate_profile_list(
        "Context",
        identity.context.iter().map(|p| {
            let followers = format!("{} followers", p.follower_count);
            profile_line(&p.username, &[p.website.as_str(), followers.as_str()], &p.data_source.to_string())
        }),
    ));
    section.push_str(&generate_profile_list(
        "Zora",
        identity
            .zora
            .iter()
            .map(|p| profile_line(&p.username, &[p.website.as_str()], &p.data_source.to_string())),
    ));
    section.push_str(&generate_profile_list(
        "Foundation",
        identity
            .foundation
            .iter()
            .map(|p| profile_line(&p.username, &[p.website.as_str()], &p.data_source.to_string())),
    ));

    for sales in &identity.foundation_sales {
        section.push_str(&generate_sales_block(sales));
    }

    // Bios are free text, shown after the compact lists.
    for profile in identity.superrare.iter().filter(|p| !p.bio.trim().is_empty()) {
        section.push_str(&format!("> {}\n\n", profile.bio.trim()));
    }

    section
}

/// `username (detail, detail) [source]`, skipping blank details.
fn profile_line(username: &str, details: &[&str], source: &str) -> String {
    let name = if username.trim().is_empty() { "(no username)" } else { username };
    let details: Vec<&str> = details
        .iter()
        .copied()
        .filter(|d| !d.trim().is_empty())
        .collect();

    if details.is_empty() {
        format!("{name} [{source}]")
    } else {
        format!("{name} ({}) [{source}]", details.join(", "))
    }
}

fn generate_profile_list(title: &str, lines: impl Iterator<Item = String>) -> String {
    let lines: Vec<String> = lines.collect();
    if lines.is_empty() {
        return String::new();
    }

    let mut block = format!("### {title}\n\n");
    for line in lines {
        block.push_str(&format!("- {line}\n"));
    }
    block.push('\n');
    block
}

fn generate_sales_block(sales: &FoundationSales) -> String {
    let mut block = String::new();

    block.push_str("### Foundation Sales\n\n");
    block.push_str("| Net Revenue | Sales | Pending Sales | Revenue | Pending Revenue |\n");
    block.push_str("|---:|---:|---:|---:|---:|\n");
    block.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        eth(&sales.net_revenue_eth),
        eth(&sales.creator.net_sales_eth),
        eth(&sales.creator.net_sales_pending_eth),
        eth(&sales.creator.net_revenue_eth),
        eth(&sales.creator.net_revenue_pending_eth),
    ));

    if sales.is_admin {
        block.push_str("Account is a Foundation admin.\n\n");
    }

    if !sales.nfts.is_empty() {
        block.push_str(&format!("Minted NFTs ({}):\n\n", sales.nfts.len()));
        for nft in &sales.nfts {
            let name = if nft.name.is_empty() { &nft.token_ipfs_path } else { &nft.name };
            block.push_str(&format!(
                "- {} (last sale {})\n",
                name,
                eth(&nft.last_sale_price_eth)
            ));
        }
        block.push('\n');
    }

    if !sales.withdrawals.is_empty() {
        block.push_str(&format!("Withdrawals ({}):\n\n", sales.withdrawals.len()));
        for withdrawal in &sales.withdrawals {
            block.push_str(&format!("- {} at {}\n", eth(&withdrawal.amount_eth), withdrawal.date));
        }
        block.push('\n');
    }

    block
}

fn eth(amount: &str) -> String {
    if amount.trim().is_empty() {
        "-".to_string()
    } else {
        format!("{amount} ETH")
    }
}

fn generate_connections_section(list: &ConnectionEntryList) -> String {
    let mut section = String::new();

    section.push_str("## Connections\n\n");

    if let Some(error) = &list.error {
        section.push_str(&format!("**Incomplete:** {error}\n\n"));
    }

    if list.connections.is_empty() {
        section.push_str("No connections found for this address.\n\n");
        return section;
    }

    section.push_str(&format!("{} edges\n\n", list.connections.len()));
    section.push_str("| From | To | Platform |\n");
    section.push_str("|---|---|---|\n");
    for edge in &list.connections {
        section.push_str(&format!(
            "| `{}` | `{}` | {} |\n",
            edge.from, edge.to, edge.platform
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!("---\n\n*Generated by identity-indexer v{}*\n", env!("CARGO_PKG_VERSION"))
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}

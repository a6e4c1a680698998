//! Topology command handlers.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use skein_clustermap::{ClusterMap, TopologyStore};
use skein_core::Config;
use tracing::debug;

use crate::cli::{OutputFormat, ShowTopologyArgs, TopologyFileArgs};

/// Handle the topology validate command.
pub fn handle_validate(args: TopologyFileArgs, config: &Config) -> Result<()> {
    let map = load(&args.file, config)?;
    println!(
        "{}: ok ({} nodes, {} disks, {} raw capacity)",
        args.file.display(),
        map.node_count(),
        map.disk_count(),
        format_bytes(map.raw_capacity_bytes())
    );
    Ok(())
}

/// Handle the topology show command.
pub fn handle_show(args: ShowTopologyArgs, config: &Config) -> Result<()> {
    let map = load(&args.file, config)?;
    match args.format {
        OutputFormat::Json => println!("{}", map.to_descriptor().to_json()?),
        OutputFormat::Text => print!("{}", describe_topology(&map)),
    }
    Ok(())
}

fn load(path: &Path, config: &Config) -> Result<Arc<ClusterMap>> {
    debug!(path = %path.display(), "Validating topology");
    let store = TopologyStore::from_config(&config.cluster_map);
    store.load_file(path).with_context(|| format!("Invalid topology {}", path.display()))
}

/// Render nodes and disks in human-readable form.
fn describe_topology(map: &ClusterMap) -> String {
    let mut out = String::new();
    if map.node_count() == 0 {
        out.push_str("\n  No data nodes in the topology.\n\n");
        return out;
    }

    let _ = writeln!(out, "\n  Data Nodes ({} total, {} disks):", map.node_count(), map.disk_count());
    out.push_str("  ─────────────────────────────────────────────────────\n");
    for node in map.nodes() {
        let _ = writeln!(
            out,
            "  {:<28}  {:<8}  {:<11}  {:>10}",
            node.id().to_string(),
            if node.datacenter().is_empty() { "-" } else { node.datacenter() },
            node.state(),
            format_bytes(node.raw_capacity_bytes())
        );
        for disk in node.disks() {
            let state = node.disk_state(disk.mount_path()).unwrap_or_else(|| disk.state());
            let _ = writeln!(
                out,
                "    {:<26}  {:<8}  {:<11}  {:>10}",
                disk.mount_path(),
                "",
                state,
                format_bytes(disk.raw_capacity_bytes())
            );
        }
    }
    out.push_str("  ─────────────────────────────────────────────────────\n");
    let _ = writeln!(out, "  Raw capacity: {}\n", format_bytes(map.raw_capacity_bytes()));
    out
}

/// Format bytes in human-readable format.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use skein_clustermap::HealthSettings;

    use super::*;

    const TOPOLOGY: &str = r#"{
        "datanodes": [{
            "hostname": "storage-1",
            "port": 6667,
            "datacenter": "dc1",
            "hardState": "AVAILABLE",
            "disks": [
                { "mountPath": "/mnt1", "hardState": "AVAILABLE", "capacityBytes": 1073741824 },
                { "mountPath": "/mnt2", "hardState": "UNAVAILABLE", "capacityBytes": 1073741824 }
            ]
        }]
    }"#;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
        assert_eq!(format_bytes(10 * 1099511627776), "10.00 TB");
    }

    #[test]
    fn test_describe_topology() {
        let store = TopologyStore::new(HealthSettings::default());
        let map = store.load_json(TOPOLOGY).unwrap();
        let text = describe_topology(&map);

        assert!(text.contains("Data Nodes (1 total, 2 disks)"));
        assert!(text.contains("storage-1:6667"));
        assert!(text.contains("/mnt2"));
        assert!(text.contains("UNAVAILABLE"));
        assert!(text.contains("Raw capacity: 2.00 GB"));
    }

    #[test]
    fn test_describe_empty_topology() {
        assert!(describe_topology(&ClusterMap::new()).contains("No data nodes"));
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"datanodes": [{"hostname": "h", "port": 0, "hardState": "AVAILABLE"}]}"#)
            .unwrap();

        let err = load(file.path(), &Config::default()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Invalid topology"));
        assert!(message.contains("out of range"));
    }
}

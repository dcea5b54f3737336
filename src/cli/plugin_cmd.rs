//! Plugin listing and inspection commands

use std::path::Path;

use anyhow::Result;

use super::output::Output;
use crate::plugin::{load_plugin, CandidateError, PackageScope, PluginHost, TypeOrigin};

pub fn list(host: &PluginHost, output: &Output, plugin_dir: &Path) {
    let registry = host.registry();

    if output.is_json() {
        let items: Vec<_> = registry
            .names()
            .into_iter()
            .filter_map(|name| registry.get(name))
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "entry_point": p.entry_point,
                    "package": p.source.as_ref().map(|s| s.display().to_string()),
                })
            })
            .collect();
        output.data(&items);
        return;
    }

    if registry.is_empty() {
        output.message(&format!("No plugins found in {}", plugin_dir.display()));
        return;
    }

    println!("{:<20} {:<30} PACKAGE", "NAME", "ENTRY POINT");
    println!("{}", "-".repeat(70));
    for name in registry.names() {
        if let Some(plugin) = registry.get(name) {
            let package = plugin
                .source
                .as_ref()
                .map(|s| s.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<20} {:<30} {}", plugin.name, plugin.entry_point, package);
        }
    }
}

pub fn inspect(host: &PluginHost, output: &Output, package: &Path) -> Result<()> {
    let types = PackageScope::open(package, host.base_scope())
        .map(|scope| scope.type_names())
        .unwrap_or_default();

    let (status, plugin, error) = match load_plugin(package, host.base_scope()) {
        Ok(plugin) => ("registered", Some(plugin), None),
        Err(e @ CandidateError::Skipped(_)) => ("skipped", None, Some(e.to_string())),
        Err(e @ CandidateError::Failed(_)) => ("failed", None, Some(e.to_string())),
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "package": package.display().to_string(),
            "status": status,
            "name": plugin.as_ref().map(|p| p.name.as_str()),
            "entry_point": plugin.as_ref().map(|p| p.entry_point.as_str()),
            "origin": plugin.as_ref().map(|p| origin_label(p.origin)),
            "error": error,
            "types": types,
        }));
        return Ok(());
    }

    println!("Package: {}", package.display());
    println!("Status: {}", status);
    if let Some(plugin) = &plugin {
        println!("Name: {}", plugin.name);
        println!("Entry point: {} ({})", plugin.entry_point, origin_label(plugin.origin));
    }
    if let Some(error) = &error {
        println!("Reason: {}", error);
    }
    if !types.is_empty() {
        println!("Types: {}", types.join(", "));
    }

    Ok(())
}

fn origin_label(origin: TypeOrigin) -> &'static str {
    match origin {
        TypeOrigin::Base => "base",
        TypeOrigin::Package => "package",
    }
}

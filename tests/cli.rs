use std::path::PathBuf;

use clap::Parser;
use dagflow::cli::CliArgs;
use dagflow::config::default_workflow_path;

#[test]
fn workflow_defaults_to_the_standard_file_name() -> Result<(), clap::Error> {
    let args = CliArgs::try_parse_from(["dagflow"])?;

    assert_eq!(args.workflow, default_workflow_path());
    assert_eq!(args.workflow, PathBuf::from("Dagflow.toml"));
    assert!(args.fanout_instances.is_none());
    assert!(!args.dry_run && !args.events && !args.json);
    Ok(())
}

#[test]
fn flags_override_defaults() -> Result<(), clap::Error> {
    let args = CliArgs::try_parse_from([
        "dagflow",
        "--workflow",
        "flows/nightly.toml",
        "--fanout-instances",
        "4",
        "--json",
    ])?;

    assert_eq!(args.workflow, PathBuf::from("flows/nightly.toml"));
    assert_eq!(args.fanout_instances, Some(4));
    assert!(args.json);
    Ok(())
}

//! Tests for the get subcommand.

use super::parse;
use crate::cli::CliCommand;
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_get_defaults() {
    match parse(&["mpdl", "get", "https://example.com/file.iso"]) {
        CliCommand::Get(args) => {
            assert_eq!(args.url, "https://example.com/file.iso");
            assert!(args.workers.is_none());
            assert!(args.output.is_none());
            assert!(args.proxy.proxies.is_empty());
            assert!(args.retry.is_none());
            assert!(!args.json);
            assert!(!args.sha256);
            assert!(!args.no_progress);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_workers_and_output() {
    match parse(&["mpdl", "get", "http://h/f", "-w", "8", "-o", "/tmp/f.bin"]) {
        CliCommand::Get(args) => {
            assert_eq!(args.workers, Some(8));
            assert_eq!(args.output.as_deref(), Some(Path::new("/tmp/f.bin")));
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_repeated_proxies_and_port_hints() {
    match parse(&[
        "mpdl",
        "get",
        "http://h/f",
        "--proxy",
        "10.0.0.1:4444",
        "--proxy",
        "http://10.0.0.2:4444",
        "--port-hint",
        "4444",
        "--port-hint",
        "4447",
        "-H",
        "User-Agent: x",
    ]) {
        CliCommand::Get(args) => {
            assert_eq!(
                args.proxy.proxies,
                vec!["10.0.0.1:4444", "http://10.0.0.2:4444"]
            );
            assert_eq!(args.proxy.port_hints, vec![4444, 4447]);
            assert_eq!(args.proxy.headers, vec!["User-Agent: x"]);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_flags() {
    match parse(&[
        "mpdl",
        "get",
        "http://h/f",
        "--retry",
        "3",
        "--json",
        "--sha256",
        "--no-progress",
        "--via",
        "http://127.0.0.1:4444",
    ]) {
        CliCommand::Get(args) => {
            assert_eq!(args.retry, Some(3));
            assert!(args.json);
            assert!(args.sha256);
            assert!(args.no_progress);
            assert_eq!(args.proxy.via.as_deref(), Some("http://127.0.0.1:4444"));
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_rejects_bad_worker_count() {
    assert!(crate::cli::Cli::try_parse_from(["mpdl", "get", "http://h/f", "-w", "many"]).is_err());
}

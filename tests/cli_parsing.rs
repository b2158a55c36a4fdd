use std::path::PathBuf;

use clap::Parser;
use nftmigrate::cli::{Cli, Commands};

#[test]
fn test_parse_start_with_overrides() {
    let cli = Cli::try_parse_from([
        "nftmigrate",
        "start",
        "--nft-contract",
        "0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D",
        "--start-token-id",
        "0",
        "--end-token-id",
        "4",
        "--validator",
        "0x00000000000000000000000000000000000000aa",
    ])
    .unwrap();

    match cli.command {
        Commands::Start(args) => {
            assert_eq!(
                args.nft_contract.as_deref(),
                Some("0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D")
            );
            assert_eq!(args.start_token_id, Some(0));
            assert_eq!(args.end_token_id, Some(4));

            let request = nftmigrate::domain::models::NewWorkflow::from(args);
            assert_eq!(
                request.validator_address.as_deref(),
                Some("0x00000000000000000000000000000000000000aa")
            );
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_phase_with_options() {
    let cli = Cli::try_parse_from(["nftmigrate", "phase", "6", "--approve"]).unwrap();

    match cli.command {
        Commands::Phase { number, options } => {
            assert_eq!(number, 6);
            assert_eq!(options.to_params().approved, Some(true));
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_reject_maps_to_explicit_false() {
    let cli = Cli::try_parse_from(["nftmigrate", "continue", "--reject"]).unwrap();
    match cli.command {
        Commands::Continue(options) => assert_eq!(options.to_params().approved, Some(false)),
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_approve_and_reject_conflict() {
    let result = Cli::try_parse_from(["nftmigrate", "retry", "--approve", "--reject"]);
    assert!(result.is_err());
}

#[test]
fn test_no_decision_leaves_policy_in_charge() {
    let cli = Cli::try_parse_from(["nftmigrate", "retry", "--validator", "0xabc"]).unwrap();
    match cli.command {
        Commands::Retry(options) => {
            let params = options.to_params();
            assert_eq!(params.approved, None);
            assert_eq!(params.validator_address.as_deref(), Some("0xabc"));
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "nftmigrate",
        "status",
        "--json",
        "--simulate",
        "--config",
        "ops/staging.yaml",
    ])
    .unwrap();

    assert!(cli.json);
    assert!(cli.simulate);
    assert_eq!(cli.config, Some(PathBuf::from("ops/staging.yaml")));
    assert!(matches!(cli.command, Commands::Status));
}

#[test]
fn test_parse_results_optional_number() {
    let all = Cli::try_parse_from(["nftmigrate", "results"]).unwrap();
    assert!(matches!(all.command, Commands::Results { number: None }));

    let one = Cli::try_parse_from(["nftmigrate", "results", "3"]).unwrap();
    assert!(matches!(one.command, Commands::Results { number: Some(3) }));
}

#[test]
fn test_parse_decide_and_reset() {
    let cli = Cli::try_parse_from([
        "nftmigrate",
        "decide",
        "approve_migration",
        "yes",
        "--comment",
        "checked manually",
    ])
    .unwrap();
    match cli.command {
        Commands::Decide {
            action,
            decision,
            comment,
        } => {
            assert_eq!(action, "approve_migration");
            assert_eq!(decision, "yes");
            assert_eq!(comment, "checked manually");
        }
        _ => panic!("Wrong command"),
    }

    let cli = Cli::try_parse_from(["nftmigrate", "reset", "-y"]).unwrap();
    assert!(matches!(cli.command, Commands::Reset { yes: true }));
}

#[test]
fn test_phase_number_must_be_numeric() {
    assert!(Cli::try_parse_from(["nftmigrate", "phase", "two"]).is_err());
    assert!(Cli::try_parse_from(["nftmigrate", "jump"]).is_err());
}

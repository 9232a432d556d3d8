use anyhow::{anyhow, bail, Context};
use clap::{Arg, ArgMatches, Command};
use hyp_token::{
    config::DEFAULT_STATE_PATH,
    token::rpc::{self, parse_address_str, parse_amount_str},
    DeployConfig, InitialMint, LedgerService, SnapshotStore,
};
use serde_json::Value;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the JSON results
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let matches = cli().get_matches();
    let output = run(&matches).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cli() -> Command {
    let state_arg = || {
        Arg::new("state")
            .short('s')
            .long("state")
            .help("Ledger state file")
            .default_value(DEFAULT_STATE_PATH)
    };

    Command::new("hyp-cli")
        .version(hyp_token::VERSION)
        .about("HYP capped token ledger")
        .subcommand_required(true)
        .subcommand(
            Command::new("deploy")
                .about("Create a new ledger with the deployer holding every role")
                .arg(Arg::new("name").long("name").help("Token name").default_value(hyp_token::TOKEN_NAME))
                .arg(Arg::new("symbol").long("symbol").help("Token symbol").default_value(hyp_token::TOKEN_SYMBOL))
                .arg(
                    Arg::new("cap")
                        .long("cap")
                        .help("Supply cap in base units")
                        .default_value("100000000000000000000000000"),
                )
                .arg(
                    Arg::new("deployer")
                        .long("deployer")
                        .help("Deployer address")
                        .required(true),
                )
                .arg(
                    Arg::new("mint-to")
                        .long("mint-to")
                        .env("MINT_TO")
                        .help("Recipient of the initial mint"),
                )
                .arg(
                    Arg::new("mint-amount")
                        .long("mint-amount")
                        .env("MINT_AMOUNT")
                        .help("Initial mint amount in base units"),
                )
                .arg(state_arg()),
        )
        .subcommand(
            Command::new("call")
                .about("Run one ledger method")
                .arg(Arg::new("method").help("Method name, e.g. transfer or balanceOf").required(true))
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Caller address")
                        .required(true),
                )
                .arg(
                    Arg::new("params")
                        .short('p')
                        .long("params")
                        .help("JSON object of method parameters")
                        .default_value("{}"),
                )
                .arg(state_arg()),
        )
        .subcommand(
            Command::new("events")
                .about("List recorded events")
                .arg(Arg::new("account").long("account").help("Only events involving this address"))
                .arg(state_arg()),
        )
        .subcommand(Command::new("info").about("Show token summary").arg(state_arg()))
}

async fn run(matches: &ArgMatches) -> anyhow::Result<Value> {
    match matches.subcommand() {
        Some(("deploy", deploy_matches)) => handle_deploy(deploy_matches),
        Some(("call", call_matches)) => handle_call(call_matches).await,
        Some(("events", events_matches)) => handle_events(events_matches),
        Some(("info", info_matches)) => handle_info(info_matches),
        _ => bail!("Use --help for available commands"),
    }
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a String> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| anyhow!("Missing --{}", name))
}

fn open_store(matches: &ArgMatches) -> anyhow::Result<SnapshotStore> {
    Ok(SnapshotStore::new(arg(matches, "state")?))
}

fn handle_deploy(matches: &ArgMatches) -> anyhow::Result<Value> {
    let initial_mint = match (matches.get_one::<String>("mint-to"), matches.get_one::<String>("mint-amount")) {
        (Some(to), Some(amount)) => Some(InitialMint {
            to: parse_address_str(to).map_err(|e| anyhow!(e))?,
            amount: parse_amount_str(amount).map_err(|e| anyhow!(e))?,
        }),
        (None, None) => None,
        _ => bail!("--mint-to and --mint-amount must be given together"),
    };

    let config = DeployConfig {
        name: arg(matches, "name")?.clone(),
        symbol: arg(matches, "symbol")?.clone(),
        cap: parse_amount_str(arg(matches, "cap")?).map_err(|e| anyhow!(e))?,
        deployer: parse_address_str(arg(matches, "deployer")?).map_err(|e| anyhow!(e))?,
        initial_mint,
        state_path: arg(matches, "state")?.into(),
    };

    let store = SnapshotStore::new(&config.state_path);
    if store.exists() {
        bail!("Ledger already exists at {}", store.path().display());
    }

    let token = config.bootstrap().context("Deployment failed")?;
    store.save(&token)?;

    info!("Ledger written to {}", store.path().display());
    Ok(rpc::answer_query(&token, &rpc::TokenQuery::Info))
}

async fn handle_call(matches: &ArgMatches) -> anyhow::Result<Value> {
    let store = open_store(matches)?;
    let caller = parse_address_str(arg(matches, "from")?).map_err(|e| anyhow!(e))?;
    let method = arg(matches, "method")?;
    let params: Value = serde_json::from_str(arg(matches, "params")?).context("Invalid --params JSON")?;

    let token = store
        .load()
        .with_context(|| format!("Failed to open ledger at {}", store.path().display()))?;
    let service = LedgerService::new(token);

    let request = rpc::decode_request(method, &params)?;
    let result = service.call(caller, method, &params).await?;

    if request.is_mutating() {
        store.save(&service.snapshot().await)?;
    }
    Ok(result)
}

fn handle_events(matches: &ArgMatches) -> anyhow::Result<Value> {
    let token = open_store(matches)?.load()?;
    let account = matches
        .get_one::<String>("account")
        .map(|addr| parse_address_str(addr))
        .transpose()
        .map_err(|e| anyhow!(e))?;

    let events: Vec<Value> = match account {
        Some(account) => token.events().for_account(account).into_iter().map(rpc::encode_event).collect(),
        None => token.events().records().iter().map(rpc::encode_event).collect(),
    };
    Ok(Value::Array(events))
}

fn handle_info(matches: &ArgMatches) -> anyhow::Result<Value> {
    let token = open_store(matches)?.load()?;
    Ok(rpc::answer_query(&token, &rpc::TokenQuery::Info))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        cli().try_get_matches_from(args.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn test_deploy_call_and_info_return_json() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("ledger.json");
        let state = state.to_str().unwrap();
        let owner = format!("0x{:040x}", 1);
        let holder = format!("0x{:040x}", 2);

        let deployed = run(&matches(&[
            "hyp-cli", "deploy", "--deployer", owner.as_str(), "--cap", "100000000",
            "--mint-to", owner.as_str(), "--mint-amount", "50000000", "--state", state,
        ]))
        .await
        .unwrap();
        assert_eq!(deployed["totalSupply"], "50000000");
        assert!(SnapshotStore::new(state).exists());

        // a second deploy must not overwrite the ledger
        let again = run(&matches(&["hyp-cli", "deploy", "--deployer", owner.as_str(), "--state", state])).await;
        assert!(again.is_err());

        let params = format!(r#"{{"to":"{}","amount":"1000"}}"#, holder);
        let receipt = run(&matches(&[
            "hyp-cli", "call", "transfer", "--from", owner.as_str(), "--params", params.as_str(), "--state", state,
        ]))
        .await
        .unwrap();
        assert_eq!(receipt["changed"], true);

        let info = run(&matches(&["hyp-cli", "info", "--state", state])).await.unwrap();
        assert_eq!(info["eventCount"], 6);
        assert_eq!(info["holders"], 2);

        let events = run(&matches(&["hyp-cli", "events", "--account", holder.as_str(), "--state", state]))
            .await
            .unwrap();
        assert_eq!(events.as_array().map(Vec::len), Some(1));
    }
}

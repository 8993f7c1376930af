use std::{net::TcpListener, path::PathBuf, process::ExitCode, sync::Arc};

use arc_swap::ArcSwap;
use dhcp6_leases::{
    backend::{Backend, Configctl},
    config::Config,
    logging::{self, LogFormat},
    mgmt::{self, MgmtContext},
    service::LeaseService,
};
use tracing::{error, info, warn, Level};

const DEFAULT_LISTEN: &str = "127.0.0.1:8547";
const DEFAULT_CONFIG: &str = "/usr/local/etc/dhcp6-leases/config.json";
const DEFAULT_CONFIGCTL: &str = "/usr/local/sbin/configctl";

const HELP: &str = "\
dhcp6-leases: DHCPv6 lease reporting service

USAGE:
  dhcp6-leases [OPTIONS]

OPTIONS:
  --listen ADDR       management listener address [default: 127.0.0.1:8547]
                      (env DHCP6_LEASES_LISTEN)
  --config PATH       interface configuration JSON
                      [default: /usr/local/etc/dhcp6-leases/config.json]
  --configctl PATH    configuration daemon client [default: /usr/local/sbin/configctl]
  --log-level LEVEL   trace, debug, info, warn or error [default: info]
  --log-format FMT    text or json [default: text]
  -h, --help          print this help
";

struct Args {
    listen: String,
    config: PathBuf,
    configctl: PathBuf,
    log_level: Level,
    log_format: LogFormat,
}

impl Args {
    fn parse() -> Result<Self, pico_args::Error> {
        let mut pargs = pico_args::Arguments::from_env();

        if pargs.contains(["-h", "--help"]) {
            print!("{HELP}");
            std::process::exit(0);
        }

        let args = Self {
            listen: pargs
                .opt_value_from_str("--listen")?
                .or_else(|| std::env::var("DHCP6_LEASES_LISTEN").ok())
                .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            config: pargs
                .opt_value_from_str("--config")?
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
            configctl: pargs
                .opt_value_from_str("--configctl")?
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIGCTL)),
            log_level: pargs.opt_value_from_str("--log-level")?.unwrap_or(Level::INFO),
            log_format: pargs.opt_value_from_str("--log-format")?.unwrap_or_default(),
        };

        let rest = pargs.finish();
        if !rest.is_empty() {
            eprintln!("ignoring unexpected arguments: {rest:?}");
        }

        Ok(args)
    }
}

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}\n\n{HELP}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_stdout(args.log_level, args.log_format);

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "unable to load interface configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        interfaces = config.interfaces.len(),
        dhcpdv6 = config.dhcpdv6.len(),
        "loaded interface configuration"
    );
    let config = Arc::new(ArcSwap::from_pointee(config));

    #[cfg(unix)]
    if let Err(e) = dhcp6_leases::signal::spawn_sighup_handler(config.clone(), args.config.clone())
    {
        warn!(%e, "SIGHUP reload unavailable");
    }

    let backend: Arc<dyn Backend> = Arc::new(Configctl::new(args.configctl));
    let ctx = MgmtContext {
        service: LeaseService::new(backend, config),
        config_path: args.config,
    };

    let listener = match TcpListener::bind(&args.listen) {
        Ok(listener) => listener,
        Err(e) => {
            error!(listen = %args.listen, %e, "unable to bind management listener");
            return ExitCode::FAILURE;
        }
    };
    info!("Successfully bound to: {}", args.listen);

    mgmt::listener(listener, &ctx);
    ExitCode::SUCCESS
}

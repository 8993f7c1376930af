use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process::ExitCode;

use serde_json::{json, Value};

const DEFAULT_CONNECT: &str = "127.0.0.1:8547";

const HELP: &str = "\
client: query a running dhcp6-leases service

USAGE:
  client [--connect ADDR] leases [--inactive] [--interface NAME]... [--search TEXT]
                                 [--sort FIELD] [--desc] [--page N] [--rows N]
  client [--connect ADDR] prefixes [--search TEXT] [--sort FIELD] [--desc]
  client [--connect ADDR] delete IP
  client [--connect ADDR] reload
  client [--connect ADDR] status
";

fn main() -> ExitCode {
    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return ExitCode::SUCCESS;
    }

    // options go before the command, which is taken as the first free argument
    let connect: String = match pargs.opt_value_from_str("--connect") {
        Ok(connect) => connect.unwrap_or_else(|| DEFAULT_CONNECT.to_string()),
        Err(e) => {
            eprintln!("error: {e}\n\n{HELP}");
            return ExitCode::FAILURE;
        }
    };
    let request = match build_request(&mut pargs) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("error: {e}\n\n{HELP}");
            return ExitCode::FAILURE;
        }
    };

    match send(&connect, &request) {
        Ok(response) => {
            match serde_json::to_string_pretty(&response) {
                Ok(pretty) => println!("{pretty}"),
                Err(_) => println!("{response}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("request to {connect} failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_request(pargs: &mut pico_args::Arguments) -> Result<Value, pico_args::Error> {
    let command: String = pargs.free_from_str()?;

    let search = |pargs: &mut pico_args::Arguments| -> Result<Value, pico_args::Error> {
        let mut request = json!({
            "current": pargs.opt_value_from_str::<_, usize>("--page")?.unwrap_or(1),
            "rowCount": pargs.opt_value_from_str::<_, i64>("--rows")?.unwrap_or(-1),
            "searchPhrase": pargs.opt_value_from_str::<_, String>("--search")?.unwrap_or_default(),
        });
        let desc = pargs.contains("--desc");
        if let Some(field) = pargs.opt_value_from_str::<_, String>("--sort")? {
            request["sort"] = json!({ field: if desc { "desc" } else { "asc" } });
        }
        Ok(request)
    };

    let request = match command.as_str() {
        "leases" => {
            let inactive = pargs.contains("--inactive");
            let interfaces: Vec<String> = pargs.values_from_str("--interface")?;
            let mut request = search(pargs)?;
            request["command"] = json!("search_lease");
            request["inactive"] = json!(inactive);
            request["selected_interfaces"] = json!(interfaces);
            request
        }
        "prefixes" => {
            let mut request = search(pargs)?;
            request["command"] = json!("search_prefix");
            request
        }
        "delete" => {
            let ip: String = pargs.free_from_str()?;
            json!({"command": "del_lease", "method": "POST", "ip": ip})
        }
        "reload" => json!({"command": "reload"}),
        "status" => json!({"command": "status"}),
        other => {
            return Err(pico_args::Error::ArgumentParsingFailed {
                cause: format!("unknown command '{other}'"),
            })
        }
    };

    Ok(request)
}

fn send(addr: &str, request: &Value) -> std::io::Result<Value> {
    let mut stream = TcpStream::connect(addr)?;
    serde_json::to_writer(&mut stream, request)?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut line = String::new();
    BufReader::new(&stream).read_line(&mut line)?;
    Ok(serde_json::from_str(&line)?)
}

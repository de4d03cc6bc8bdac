use std::env;
use std::process;
use std::time::SystemTime;

use domain::adapters::memory_repo::{InMemoryCompanyRepo, InMemoryOwnerRepo};
use domain::service::{CompanyService, OwnerService};
use domain::{Clock, CompanyFilter, OwnerFilter};

struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain companies [--name <name>] [--city <city>] [--state <state>]\n  domain owners [--last-name <name>] [--city <city>]\n\nNotes:\n  - This demo CLI queries the built-in sample records; nothing is persisted.",
        domain::about()
    );
}

/// Parse `--flag <value>` pairs into (flag, value) tuples.
fn parse_flags(rest: Vec<String>) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    let mut it = rest.into_iter();
    while let Some(flag) = it.next() {
        if !flag.starts_with("--") {
            return Err(format!("unknown argument: {}", flag));
        }
        let Some(val) = it.next() else {
            return Err(format!("{} requires a value", flag));
        };
        out.push((flag, val));
    }
    Ok(out)
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };
    let flags = parse_flags(args.collect())?;

    match cmd.as_str() {
        "companies" => {
            let svc = CompanyService::new(InMemoryCompanyRepo::new(), StdClock);
            let sample = domain::sample::companies().map_err(|e| e.to_string())?;
            for fields in sample {
                svc.create(fields).map_err(|e| e.to_string())?;
            }

            let mut filter = CompanyFilter::default();
            for (flag, val) in flags {
                match flag.as_str() {
                    "--name" => filter.name = Some(val),
                    "--city" => filter.city = Some(val),
                    "--state" => filter.state = Some(val),
                    unk => return Err(format!("unknown flag for companies: {}", unk)),
                }
            }

            let found = svc
                .list(&filter)
                .map_err(|e| format!("list failed: {}", e))?;
            for c in found {
                println!("{}\t{}\t{}, {}", c.ein, c.name, c.street, c.city);
            }
            Ok(())
        }
        "owners" => {
            let svc = OwnerService::new(InMemoryOwnerRepo::new(), StdClock);
            let sample = domain::sample::owners().map_err(|e| e.to_string())?;
            for input in sample {
                svc.create(input).map_err(|e| e.to_string())?;
            }

            let mut filter = OwnerFilter::default();
            for (flag, val) in flags {
                match flag.as_str() {
                    "--last-name" => filter.last_name = Some(val),
                    "--city" => filter.city = Some(val),
                    unk => return Err(format!("unknown flag for owners: {}", unk)),
                }
            }

            let found = svc
                .list(&filter)
                .map_err(|e| format!("list failed: {}", e))?;
            for o in found {
                let companies: Vec<&str> = o.companies.iter().map(|c| c.name.as_str()).collect();
                println!(
                    "{}\t{} {}\t{}\t[{}]",
                    o.ssn,
                    o.first_name,
                    o.last_name,
                    o.email.as_str(),
                    companies.join(", ")
                );
            }
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}

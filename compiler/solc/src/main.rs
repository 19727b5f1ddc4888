//! Contract-language compiler CLI.

use sol_ssa::Target;
use solc::{check_source, compile_source, lex_source, parse_summary};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "build" => {
            if args.len() < 3 {
                eprintln!("Usage: solc build <file.sol> [--target=evm|ewasm]");
                std::process::exit(1);
            }
            let target = parse_target(&args[3..]);
            let source = read_source(&args[2]);
            match compile_source(&source, &args[2], target) {
                Ok(ir) => print!("{ir}"),
                Err(failure) => {
                    eprint!("{}", failure.rendered);
                    std::process::exit(1);
                }
            }
        }
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: solc check <file.sol>");
                std::process::exit(1);
            }
            let source = read_source(&args[2]);
            match check_source(&source, &args[2]) {
                Ok(()) => println!("{}: no errors", args[2]),
                Err(failure) => {
                    eprint!("{}", failure.rendered);
                    std::process::exit(1);
                }
            }
        }
        "parse" => {
            if args.len() < 3 {
                eprintln!("Usage: solc parse <file.sol>");
                std::process::exit(1);
            }
            let source = read_source(&args[2]);
            match parse_summary(&source, &args[2]) {
                Ok(summary) => print!("{summary}"),
                Err(failure) => {
                    eprint!("{}", failure.rendered);
                    std::process::exit(1);
                }
            }
        }
        "lex" => {
            if args.len() < 3 {
                eprintln!("Usage: solc lex <file.sol>");
                std::process::exit(1);
            }
            let source = read_source(&args[2]);
            print!("{}", lex_source(&source));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("unknown command `{other}`");
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_target(args: &[String]) -> Target {
    for arg in args {
        match arg.as_str() {
            "--target=evm" => return Target::Evm,
            "--target=ewasm" => return Target::Ewasm,
            other => {
                eprintln!("unknown option `{other}`");
                std::process::exit(1);
            }
        }
    }
    Target::Evm
}

fn read_source(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("cannot read {path}: {err}");
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Contract-language compiler");
    println!();
    println!("Usage:");
    println!("  solc build <file.sol> [--target=evm|ewasm]   compile to textual IR");
    println!("  solc check <file.sol>                        parse and report diagnostics");
    println!("  solc parse <file.sol>                        print a declaration summary");
    println!("  solc lex <file.sol>                          print the token stream");
}

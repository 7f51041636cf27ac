use clap::{Parser as ClapParser, Subcommand};
use dynexpr::builtins;
use dynexpr::cli::{execute_check, CheckOptions, CliError};
use dynexpr::output;

#[derive(ClapParser)]
#[command(name = "dynexpr")]
#[command(about = "dynexpr - Parse and type-check dynamic expressions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and report its type
    Check {
        /// The expression to parse
        expression: String,

        /// Typed parameter of the form name:Type (repeatable)
        #[arg(short, long)]
        param: Vec<String>,

        /// Type of the anonymous iteration parameter `it`
        #[arg(long)]
        it: Option<String>,

        /// Promote the result to this type
        #[arg(short, long)]
        result: Option<String>,

        /// Print the typed tree
        #[arg(short, long)]
        tree: bool,

        /// Print the typed tree as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the predefined types
    Types,
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Check { expression, param, it, result, tree, json } => {
            let options = CheckOptions {
                expression,
                parameters: param,
                it_type: it,
                result_type: result,
            };
            let checked = execute_check(&options)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output::to_json(&checked.expr))
                        .expect("tree rendering is infallible")
                );
            } else if tree {
                print!("{}", output::to_text(&checked.expr));
            } else {
                println!("{}", checked.type_name);
            }
            Ok(())
        }
        Commands::Types => {
            for ty in builtins::PREDEFINED.iter() {
                println!("{}", ty.full_name());
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

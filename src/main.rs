use clap::Parser;
use miette::Result;
use submat::cli::{Cli, Commands};

/// Log to stderr; RUST_LOG wins over --verbose
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "submat=debug" } else { "submat=warn" };
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_directive.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_directive)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    // Terminate silently on a closed pipe (`submat inbound | head`)
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(global.verbose);

    match cli.command {
        Commands::Init(args) => submat::cli::commands::init::run(args),
        Commands::Upload(args) => submat::cli::commands::upload::run(args, &global),
        Commands::Status(args) => submat::cli::commands::status::run(args, &global),
        Commands::Inbound(args) => submat::cli::commands::inbound::run(args, &global),
        Commands::Orders(args) => submat::cli::commands::orders::run(args, &global),
        Commands::Returns(cmd) => submat::cli::commands::returns::run(cmd, &global),
        Commands::Common(args) => submat::cli::commands::common::run(args, &global),
        Commands::Label(cmd) => submat::cli::commands::label::run(cmd, &global),
        Commands::Completions(args) => submat::cli::commands::completions::run(args),
    }
}

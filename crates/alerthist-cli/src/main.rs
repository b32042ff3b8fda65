use std::io;

fn main() {
    alerthist_cli::init_tracing();
    let stdout = io::stdout();
    let stderr = io::stderr();
    let exit_code = alerthist_cli::run_cli(std::env::args_os(), &mut stdout.lock(), &mut stderr.lock());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

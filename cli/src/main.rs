//! Binary entrypoint for fontfeat-cli (made by FontLab https://www.fontlab.com/)

fn main() {
    if let Err(err) = fontfeat_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

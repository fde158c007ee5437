/// The xtask binary delegates entirely to nih_plug_xtask, which provides
/// the `bundle` subcommand. Usage:
///
///   cargo xtask bundle comp-delay-mono --release
///
/// This compiles the plugin as a cdylib and packages it into
/// `target/bundled/Comp Delay Mono.vst3` and `.clap`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}

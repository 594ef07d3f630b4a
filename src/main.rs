#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    pivot_viewer::flow::run(pivot_viewer::ViewerConfig::default())
}

// On the web the library's `start` entry point runs the viewer.
#[cfg(target_arch = "wasm32")]
fn main() {}

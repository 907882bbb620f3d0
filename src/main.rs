// 全局内存分配器：使用 jemalloc
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

// 入口只做转发，实际逻辑在 cli 模块
use lob_engine::cli;

#[tokio::main]
async fn main() {
    if let Err(err) = cli::run().await {
        tracing::error!(error = %err, "lob-engine failed");
        std::process::exit(1);
    }
}

use crate::server::config::AppConfig;
use crate::server::{build_quota_store, load_config, open_storage, resolve_dispatcher, validate_config};
use anyhow::bail;
use chatgate_core::QuotaStore;

pub async fn run() -> anyhow::Result<()> {
    println!("🏥 Chatgate Doctor\n");

    print!("Loading configuration... ");
    let config = match load_config() {
        Ok(config) => {
            println!("✅ Loaded");
            config
        }
        Err(e) => {
            println!("❌ {:#}", e);
            bail!("configuration could not be loaded");
        }
    };

    let mut all_ok = true;
    all_ok &= check_validation(&config);
    all_ok &= check_quota_store(&config).await;
    all_ok &= check_storage(&config).await;
    all_ok &= check_providers(&config);

    println!();
    if all_ok {
        println!("✅ All checks passed! Ready to run Chatgate.");
        Ok(())
    } else {
        println!("⚠️  Some checks failed. Please fix the issues above.");
        bail!("doctor checks failed");
    }
}

fn check_validation(config: &AppConfig) -> bool {
    print!("Validating configuration... ");
    match validate_config(config) {
        Ok(()) => {
            println!("✅ Valid");
            true
        }
        Err(e) => {
            println!("❌ {}", e);
            false
        }
    }
}

async fn check_quota_store(config: &AppConfig) -> bool {
    print!("Checking quota store... ");
    let store = match build_quota_store(config) {
        Ok(store) => store,
        Err(e) => {
            println!("❌ {:#}", e);
            return false;
        }
    };

    match store.ping().await {
        Ok(latency) => {
            println!("✅ {} ({}ms)", store.backend(), latency.as_millis());
            true
        }
        Err(e) => {
            // Requests still succeed, quota is not enforced
            println!("⚠️  {} unreachable: {}", store.backend(), e);
            println!("  Requests will fail open until the store is reachable");
            false
        }
    }
}

async fn check_storage(config: &AppConfig) -> bool {
    print!("Checking usage storage... ");
    match open_storage(&config.storage).await {
        Ok(storage) => match storage.health_check().await {
            Ok(latency) => {
                let records = storage.usage_count().await.unwrap_or(0);
                println!("✅ SQLite ({}ms, {} usage records)", latency.as_millis(), records);
                true
            }
            Err(e) => {
                println!("❌ {}", e);
                false
            }
        },
        Err(e) => {
            println!("❌ {}", e);
            false
        }
    }
}

fn check_providers(config: &AppConfig) -> bool {
    print!("Resolving provider chain... ");
    match resolve_dispatcher(&config.providers) {
        Ok(dispatcher) => {
            println!("✅ {}", dispatcher.chain().join(" → "));
            true
        }
        Err(e) => {
            println!("❌ {}", e);
            false
        }
    }
}

use {
    prometheus::Registry,
    prometheus_metric_storage::StorageRegistry,
    std::sync::LazyLock,
};

static REGISTRY: LazyLock<StorageRegistry> =
    LazyLock::new(|| StorageRegistry::new(Registry::default()));

/// The storage registry metric structs register themselves on.
pub fn get_storage_registry() -> &'static StorageRegistry {
    &REGISTRY
}

/// The underlying prometheus registry, for scraping.
pub fn get_registry() -> &'static Registry {
    REGISTRY.registry()
}

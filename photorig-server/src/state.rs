use parking_lot::Mutex;
use std::sync::Arc;

/// Accès transactionnel à un groupe d'état nommé : chaque bucket est sa
/// propre section critique exclusive, sans coordination entre buckets.
pub struct Bucket<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for Bucket<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> Bucket<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(Mutex::new(value)) }
    }

    /// Lecture-modification-écriture exclusive sur le groupe.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}

impl<T: Clone> Bucket<T> {
    /// Copie instantanée du contenu du groupe.
    pub fn read(&self) -> T {
        self.inner.lock().clone()
    }
}

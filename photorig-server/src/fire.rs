use crate::state::Bucket;

/// Drapeau de déclenchement à un coup : armé par POST /fire, consommé par
/// au plus un contrôleur pollant.
#[derive(Clone)]
pub struct FireFlag {
    inner: Bucket<bool>,
}

impl FireFlag {
    pub fn new() -> Self {
        Self { inner: Bucket::new(false) }
    }

    pub fn arm(&self) {
        self.inner.write(|flag| *flag = true);
    }

    /// Lecture-et-effacement en une seule transaction : un seul appelant
    /// voit true pour un armement donné.
    pub fn consume(&self) -> bool {
        self.inner.write(|flag| std::mem::replace(flag, false))
    }
}

/// Encryption collaborator for stored connection strings.
///
/// The scheme and key management live outside this crate. Implementations must
/// never return plaintext from `encrypt`.
pub trait UriCipher {
    fn encrypt(&self, plaintext: &str) -> anyhow::Result<String>;
    fn decrypt(&self, ciphertext: &str) -> anyhow::Result<String>;
}

use std::collections::BTreeMap;

use super::address::{encode_address, Address, AddressKey, AddressVariant, ChainId};
use crate::crypto::MasterKey;
use crate::errors::{WalletError, WalletResult};

const MAX_NAME_LEN: usize = 32;

/// One address encoding of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    pub variant: AddressVariant,
    /// Version byte prepended to the payload.
    pub version: u8,
    /// Hash prefix unique across the whole registry.
    pub domain_tag: String,
    /// Registry schema version in which this variant first appeared.
    pub introduced_in: u32,
}

impl VariantSpec {
    pub fn new(
        variant: impl Into<AddressVariant>,
        version: u8,
        domain_tag: impl Into<String>,
        introduced_in: u32,
    ) -> Self {
        Self {
            variant: variant.into(),
            version,
            domain_tag: domain_tag.into(),
            introduced_in,
        }
    }
}

/// A chain and the address variants derived for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    pub chain: ChainId,
    /// Version byte reserved for exported secrets of this chain.
    pub secret_version: u8,
    pub variants: Vec<VariantSpec>,
}

impl ChainSpec {
    pub fn new(chain: impl Into<ChainId>, secret_version: u8) -> Self {
        Self {
            chain: chain.into(),
            secret_version,
            variants: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: VariantSpec) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn variant(&self, variant: &AddressVariant) -> Option<&VariantSpec> {
        self.variants.iter().find(|spec| &spec.variant == variant)
    }
}

/// Ordered set of chains and variants a wallet derives addresses for.
///
/// Registration validates that domain tags are unique and that no address version
/// byte equals any secret version byte. Existing entries are never modified, which
/// is what lets stored records be extended instead of re-derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressRegistry {
    chains: Vec<ChainSpec>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shipped with schema version 1.
    ///
    /// Built without the checks of [`AddressRegistry::register_chain`]; the
    /// `standard_chains_pass_registration` test holds the table to them.
    pub fn standard() -> Self {
        Self {
            chains: standard_chains(),
        }
    }

    /// Add a chain together with its initial variants.
    pub fn register_chain(&mut self, spec: ChainSpec) -> WalletResult<()> {
        validate_name("chain", spec.chain.as_str())?;
        if self.chain(&spec.chain).is_some() {
            return Err(WalletError::ValidationError(format!(
                "Chain '{}' is already registered",
                spec.chain
            )));
        }
        if self.address_versions().any(|version| version == spec.secret_version) {
            return Err(WalletError::ValidationError(format!(
                "Secret version 0x{:02x} of '{}' is used by an address variant",
                spec.secret_version, spec.chain
            )));
        }

        let mut spec = spec;
        let variants = std::mem::take(&mut spec.variants);
        let chain = spec.chain.clone();
        self.chains.push(spec);

        for variant in variants {
            if let Err(err) = self.register_variant(&chain, variant) {
                self.chains.pop();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Append a variant to an already registered chain.
    pub fn register_variant(&mut self, chain: &ChainId, spec: VariantSpec) -> WalletResult<()> {
        validate_name("variant", spec.variant.as_str())?;
        if spec.domain_tag.is_empty() {
            return Err(WalletError::ValidationError(
                "Domain tag cannot be empty".to_string(),
            ));
        }
        if spec.introduced_in == 0 {
            return Err(WalletError::ValidationError(
                "Schema versions start at 1".to_string(),
            ));
        }
        if self
            .entries()
            .any(|(_, existing)| existing.domain_tag == spec.domain_tag)
        {
            return Err(WalletError::ValidationError(format!(
                "Domain tag '{}' is already registered",
                spec.domain_tag
            )));
        }
        if self.chains.iter().any(|c| c.secret_version == spec.version) {
            return Err(WalletError::ValidationError(format!(
                "Address version 0x{:02x} is reserved for exported secrets",
                spec.version
            )));
        }

        let target = self
            .chains
            .iter_mut()
            .find(|c| &c.chain == chain)
            .ok_or_else(|| {
                WalletError::ValidationError(format!("Chain '{chain}' is not registered"))
            })?;
        if target.variant(&spec.variant).is_some() {
            return Err(WalletError::ValidationError(format!(
                "Variant '{}:{}' is already registered",
                chain, spec.variant
            )));
        }
        target.variants.push(spec);
        Ok(())
    }

    pub fn chain(&self, chain: &ChainId) -> Option<&ChainSpec> {
        self.chains.iter().find(|spec| &spec.chain == chain)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainSpec> {
        self.chains.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ChainSpec, &VariantSpec)> {
        self.chains
            .iter()
            .flat_map(|chain| chain.variants.iter().map(move |variant| (chain, variant)))
    }

    pub fn keys(&self) -> impl Iterator<Item = AddressKey> + '_ {
        self.entries()
            .map(|(chain, variant)| AddressKey::new(chain.chain.clone(), variant.variant.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest schema version of any registered variant, 0 when empty.
    pub fn schema_version(&self) -> u32 {
        self.entries()
            .map(|(_, variant)| variant.introduced_in)
            .max()
            .unwrap_or(0)
    }

    /// Resolve a (chain, variant) pair, failing before any hashing when it is not
    /// registered.
    pub fn lookup(
        &self,
        chain: &ChainId,
        variant: &AddressVariant,
    ) -> WalletResult<(&ChainSpec, &VariantSpec)> {
        self.chain(chain)
            .and_then(|spec| spec.variant(variant).map(|v| (spec, v)))
            .ok_or_else(|| WalletError::UnknownVariant {
                chain: chain.to_string(),
                variant: variant.to_string(),
            })
    }

    pub fn encode(
        &self,
        master_key: &MasterKey,
        chain: &ChainId,
        variant: &AddressVariant,
    ) -> WalletResult<Address> {
        let (_, spec) = self.lookup(chain, variant)?;
        Ok(encode_address(master_key, spec))
    }

    /// Addresses for every registered pair.
    pub fn derive_all(&self, master_key: &MasterKey) -> BTreeMap<AddressKey, Address> {
        self.entries()
            .map(|(chain, variant)| {
                (
                    AddressKey::new(chain.chain.clone(), variant.variant.clone()),
                    encode_address(master_key, variant),
                )
            })
            .collect()
    }

    /// Re-derive the address for `key` and compare it with `address`.
    pub fn verify(
        &self,
        master_key: &MasterKey,
        key: &AddressKey,
        address: &Address,
    ) -> WalletResult<bool> {
        let expected = self.encode(master_key, &key.chain, &key.variant)?;
        Ok(&expected == address)
    }

    fn address_versions(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries().map(|(_, variant)| variant.version)
    }
}

fn validate_name(kind: &str, name: &str) -> WalletResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(WalletError::ValidationError(format!(
            "Invalid {kind} name '{name}': use 1-{MAX_NAME_LEN} lowercase letters, digits or '-'"
        )));
    }
    Ok(())
}

fn standard_chains() -> Vec<ChainSpec> {
    let v1 = |chain: &str, variant: &str, version: u8| {
        VariantSpec::new(
            variant,
            version,
            format!("identity-wallet/{chain}/{variant}/v1"),
            1,
        )
    };

    vec![
        ChainSpec::new("bitcoin", 0x80)
            .with_variant(v1("bitcoin", "legacy", 0x00))
            .with_variant(v1("bitcoin", "script", 0x05)),
        // Shares the Bitcoin legacy version byte; only the domain tag differs.
        ChainSpec::new("bitcoin-cash", 0x80).with_variant(v1("bitcoin-cash", "legacy", 0x00)),
        ChainSpec::new("litecoin", 0xB0)
            .with_variant(v1("litecoin", "legacy", 0x30))
            .with_variant(v1("litecoin", "script", 0x32)),
        ChainSpec::new("dogecoin", 0x9E)
            .with_variant(v1("dogecoin", "legacy", 0x1E))
            .with_variant(v1("dogecoin", "script", 0x16)),
    ]
}

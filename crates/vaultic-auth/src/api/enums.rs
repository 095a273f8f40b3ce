use serde_repr::{Deserialize_repr, Serialize_repr};

/// Server-declared login states. Transitions are server-authoritative: the
/// client infers the next request from the current state and never invents
/// states of its own.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum LoginState {
    DeviceApprovalRequired = 2,
    DeviceLocked = 3,
    AccountLocked = 4,
    DeviceAccountLocked = 5,
    Upgrade = 6,
    LicenseExpired = 7,
    RegionRedirect = 8,
    RedirectCloudSso = 9,
    RedirectOnsiteSso = 10,
    Requires2fa = 12,
    RequiresAuthHash = 13,
    RequiresUsername = 14,
    RequiresAccountCreation = 15,
    RequiresDeviceEncryptedDataKey = 16,
    LoggedIn = 99,
}

impl LoginState {
    /// Map a raw wire value, `None` for anything this client does not know.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            2 => Self::DeviceApprovalRequired,
            3 => Self::DeviceLocked,
            4 => Self::AccountLocked,
            5 => Self::DeviceAccountLocked,
            6 => Self::Upgrade,
            7 => Self::LicenseExpired,
            8 => Self::RegionRedirect,
            9 => Self::RedirectCloudSso,
            10 => Self::RedirectOnsiteSso,
            12 => Self::Requires2fa,
            13 => Self::RequiresAuthHash,
            14 => Self::RequiresUsername,
            15 => Self::RequiresAccountCreation,
            16 => Self::RequiresDeviceEncryptedDataKey,
            99 => Self::LoggedIn,
            _ => return None,
        })
    }
}

/// Which scheme protects the data key in a login response.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum EncryptedDataKeyType {
    NoKey = 0,
    ByDevicePublicKey = 1,
    ByPassword = 2,
    ByAlternate = 3,
    ByBio = 4,
}

impl EncryptedDataKeyType {
    /// Map a raw wire value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::NoKey,
            1 => Self::ByDevicePublicKey,
            2 => Self::ByPassword,
            3 => Self::ByAlternate,
            4 => Self::ByBio,
            _ => return None,
        })
    }
}

/// Restriction attached to an issued session token.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum SessionTokenType {
    NoRestriction = 0,
    AccountRecovery = 1,
    ShareAccount = 2,
    Purchase = 3,
    Restrict = 4,
}

impl SessionTokenType {
    /// Map a raw wire value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::NoRestriction,
            1 => Self::AccountRecovery,
            2 => Self::ShareAccount,
            3 => Self::Purchase,
            4 => Self::Restrict,
            _ => return None,
        })
    }
}

/// Two-factor verification channel types.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum TwoFactorChannelType {
    Totp = 2,
    Sms = 3,
    Duo = 4,
    RsaSecurId = 5,
    U2f = 7,
    WebAuthn = 8,
    Dna = 9,
}

impl TwoFactorChannelType {
    /// Map a raw wire value; unknown channel types are simply unsupported.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            2 => Self::Totp,
            3 => Self::Sms,
            4 => Self::Duo,
            5 => Self::RsaSecurId,
            7 => Self::U2f,
            8 => Self::WebAuthn,
            9 => Self::Dna,
            _ => return None,
        })
    }

    /// True for channels that require a physical security key.
    pub fn is_hardware(self) -> bool {
        matches!(self, Self::U2f | Self::WebAuthn)
    }
}

/// Push notification kinds for two-factor and device approval.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum TwoFactorPushType {
    VaultPush = 1,
    Sms = 2,
    Duo = 3,
}

/// Response envelope tags for hardware-key validation.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum TwoFactorValueType {
    U2f = 6,
    WebAuthn = 7,
}

/// How long a successful two-factor validation is trusted.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum TwoFactorDuration {
    EveryLogin = 0,
    TwelveHours = 2,
    TwentyFourHours = 3,
    ThirtyDays = 4,
    Forever = 5,
}

/// Which credential derivation a login attempt uses.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum LoginType {
    Normal = 0,
    Alternate = 3,
}

/// How a login attempt is (re)entered.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum LoginMethod {
    ExistingAccount = 1,
    AfterSso = 3,
}

/// How the password behind an auth hash was obtained.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum PasswordMethod {
    Entered = 0,
}

/// Device status reported by approval endpoints.
#[allow(missing_docs)]
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i32)]
pub enum DeviceStatus {
    NeedsApproval = 0,
    Ok = 1,
    Disabled = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_state_raw_round_trip() {
        for raw in [2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 13, 14, 15, 16, 99] {
            let state = LoginState::from_raw(raw).unwrap();
            assert_eq!(state as i32, raw);
        }
        assert_eq!(LoginState::from_raw(0), None);
        assert_eq!(LoginState::from_raw(11), None);
        assert_eq!(LoginState::from_raw(42), None);
    }

    #[test]
    fn test_hardware_channel_classification() {
        assert!(TwoFactorChannelType::U2f.is_hardware());
        assert!(TwoFactorChannelType::WebAuthn.is_hardware());
        assert!(!TwoFactorChannelType::Totp.is_hardware());
        assert!(!TwoFactorChannelType::Sms.is_hardware());
    }
}

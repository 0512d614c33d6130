use crate::error::ScmError;
use std::fmt;
use std::str::FromStr;

/// Supported git hosting providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitProvider {
    Github,
    Gitlab,
    Gogs,
}

impl GitProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GitProvider::Github => "github",
            GitProvider::Gitlab => "gitlab",
            GitProvider::Gogs => "gogs",
        }
    }
}

impl fmt::Display for GitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GitProvider {
    type Err = ScmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "github" => Ok(GitProvider::Github),
            "gitlab" => Ok(GitProvider::Gitlab),
            "gogs" => Ok(GitProvider::Gogs),
            other => Err(ScmError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_providers() {
        assert_eq!("github".parse::<GitProvider>().unwrap(), GitProvider::Github);
        assert_eq!("gitlab".parse::<GitProvider>().unwrap(), GitProvider::Gitlab);
        assert_eq!(" gogs ".parse::<GitProvider>().unwrap(), GitProvider::Gogs);
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = "bitbucket".parse::<GitProvider>().unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(err.to_string(), "git provider 'bitbucket' is not supported");
    }
}

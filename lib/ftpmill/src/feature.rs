/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the ftpmill authors
 */

/// Server capabilities learned from the FEAT reply.
///
/// Absence of a feature line only means the server did not advertise it,
/// older servers may still accept the corresponding command.
#[derive(Debug, Default)]
pub struct FtpServerFeature {
    utf8: bool,
    epsv: bool,
    eprt: bool,
    mlst: bool,
    mdtm: bool,
    size: bool,
    rest_stream: bool,
    pret: bool,
    auth_tls: bool,
    prot: bool,
}

impl FtpServerFeature {
    pub(crate) fn parse_and_set(&mut self, line: &str) {
        let mut parts = line.split_ascii_whitespace();
        let Some(name) = parts.next() else {
            return;
        };
        match name.to_ascii_uppercase().as_str() {
            "UTF8" => self.utf8 = true,
            "EPSV" => self.epsv = true,
            "EPRT" => self.eprt = true,
            "MLST" | "MLSD" => self.mlst = true,
            "MDTM" => self.mdtm = true,
            "SIZE" => self.size = true,
            "PRET" => self.pret = true,
            "PROT" => self.prot = true,
            "REST" => {
                if parts.next().is_some_and(|v| v.eq_ignore_ascii_case("STREAM")) {
                    self.rest_stream = true;
                }
            }
            "AUTH" => {
                // vsftpd style "AUTH TLS" as well as "AUTH TLS;TLS-C;SSL;"
                for v in parts.flat_map(|v| v.split(';')) {
                    if v.eq_ignore_ascii_case("TLS") || v.eq_ignore_ascii_case("SSL") {
                        self.auth_tls = true;
                    }
                }
            }
            _ => {}
        }
    }

    #[inline]
    pub fn support_utf8(&self) -> bool {
        self.utf8
    }

    #[inline]
    pub fn support_epsv(&self) -> bool {
        self.epsv
    }

    #[inline]
    pub fn support_eprt(&self) -> bool {
        self.eprt
    }

    #[inline]
    pub fn support_mlst(&self) -> bool {
        self.mlst
    }

    #[inline]
    pub fn support_mdtm(&self) -> bool {
        self.mdtm
    }

    #[inline]
    pub fn support_size(&self) -> bool {
        self.size
    }

    #[inline]
    pub fn support_rest_stream(&self) -> bool {
        self.rest_stream
    }

    #[inline]
    pub fn support_pret(&self) -> bool {
        self.pret
    }

    #[inline]
    pub fn support_auth_tls(&self) -> bool {
        self.auth_tls
    }

    #[inline]
    pub fn support_prot(&self) -> bool {
        self.prot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_feat_lines() {
        let mut feature = FtpServerFeature::default();
        for line in [
            "UTF8",
            "EPSV",
            "MLST type*;size*;modify*;",
            "REST STREAM",
            "AUTH TLS;SSL",
            "SIZE",
            "LANG EN*",
        ] {
            feature.parse_and_set(line);
        }
        assert!(feature.support_utf8());
        assert!(feature.support_epsv());
        assert!(feature.support_mlst());
        assert!(feature.support_rest_stream());
        assert!(feature.support_size());
        assert!(!feature.support_pret());
        assert!(!feature.support_eprt());
    }

    #[test]
    fn parse_auth_tls() {
        let mut feature = FtpServerFeature::default();
        feature.parse_and_set("AUTH TLS");
        assert!(feature.support_auth_tls());
    }
}

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{ZATCA_CUSTOMIZATION_ID, ZATCA_PROFILE_ID, ubl_ns};

/// Result of a single named structure check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureCheck {
    pub name: &'static str,
    pub passed: bool,
}

/// Outcome of [`check_structure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureReport {
    pub checks: Vec<StructureCheck>,
}

impl StructureReport {
    /// Number of checks that passed.
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn total(&self) -> usize {
        self.checks.len()
    }

    /// All checks passed.
    pub fn is_compliant(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Look up a check by name.
    pub fn check(&self, name: &str) -> Option<bool> {
        self.checks.iter().find(|c| c.name == name).map(|c| c.passed)
    }

    /// Names of the failed checks.
    pub fn failures(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name)
            .collect()
    }
}

#[derive(Default)]
struct Seen {
    declaration: bool,
    invoice_root: bool,
    ubl_namespace: bool,
    customization_id: bool,
    profile_id: bool,
    vat_percent: bool,
    sar_currency: bool,
    supplier: bool,
    customer: bool,
    tax_total: bool,
    monetary_total: bool,
    invoice_lines: bool,
}

impl Seen {
    fn element(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"cbc:Percent" => self.vat_percent = true,
            b"cac:AccountingSupplierParty" => self.supplier = true,
            b"cac:AccountingCustomerParty" => self.customer = true,
            b"cac:TaxTotal" => self.tax_total = true,
            b"cac:LegalMonetaryTotal" => self.monetary_total = true,
            b"cac:InvoiceLine" => self.invoice_lines = true,
            _ => {}
        }
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == b"currencyID" && attr.value.as_ref() == b"SAR" {
                self.sar_currency = true;
            }
        }
    }

    fn root(&mut self, e: &BytesStart<'_>) {
        self.invoice_root = e.local_name().as_ref() == b"Invoice";
        self.ubl_namespace = e.attributes().flatten().any(|a| {
            a.key.as_ref() == b"xmlns" && a.value.as_ref() == ubl_ns::INVOICE.as_bytes()
        });
    }

    fn text(&mut self, element: &[u8], text: &str) {
        match element {
            b"cbc:CustomizationID" => {
                self.customization_id |= text.trim() == ZATCA_CUSTOMIZATION_ID;
            }
            b"cbc:ProfileID" => self.profile_id |= text.trim() == ZATCA_PROFILE_ID,
            _ => {}
        }
    }
}

/// Parse a generated document and report which structural requirements it meets.
///
/// This is a local sanity check, not schema or business-rule validation; the
/// authority remains the judge of compliance.
pub fn check_structure(xml: &str) -> StructureReport {
    let mut reader = Reader::from_str(xml);
    let mut seen = Seen::default();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut roots = 0usize;
    let mut well_formed = true;

    loop {
        match reader.read_event() {
            Ok(Event::Decl(_)) => {
                if roots == 0 {
                    seen.declaration = true;
                }
            }
            Ok(Event::Start(e)) => {
                if stack.is_empty() {
                    roots += 1;
                    seen.root(&e);
                }
                seen.element(&e);
                stack.push(e.name().as_ref().to_vec());
            }
            Ok(Event::Empty(e)) => {
                if stack.is_empty() {
                    roots += 1;
                    seen.root(&e);
                }
                seen.element(&e);
            }
            Ok(Event::Text(t)) => match (stack.last(), t.unescape()) {
                (Some(name), Ok(text)) => seen.text(name, &text),
                (_, Err(_)) => {
                    well_formed = false;
                    break;
                }
                (None, Ok(_)) => {}
            },
            Ok(Event::End(_)) => {
                if stack.pop().is_none() {
                    well_formed = false;
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => {
                well_formed = false;
                break;
            }
        }
    }
    if !stack.is_empty() || roots != 1 {
        well_formed = false;
    }

    let checks = [
        ("xml_declaration", seen.declaration),
        ("invoice_root", seen.invoice_root),
        ("customization_id", seen.customization_id),
        ("profile_id", seen.profile_id),
        ("ubl_namespace", seen.ubl_namespace),
        ("vat_percent", seen.vat_percent),
        ("sar_currency", seen.sar_currency),
        ("supplier", seen.supplier),
        ("customer", seen.customer),
        ("tax_total", seen.tax_total),
        ("monetary_total", seen.monetary_total),
        ("invoice_lines", seen.invoice_lines),
        ("well_formed", well_formed),
    ]
    .into_iter()
    .map(|(name, passed)| StructureCheck { name, passed })
    .collect();

    StructureReport { checks }
}

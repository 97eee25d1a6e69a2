use rust_decimal::Decimal;

use super::xml_utils::{XmlResult, XmlWriter, format_percent};
use super::{
    INVOICE_TYPE_CODE, SIMPLIFIED_TRANSACTION_CODE, UNIT_CODE, ZATCA_CUSTOMIZATION_ID,
    ZATCA_PROFILE_ID, ubl_ns,
};
use crate::core::*;
use crate::qr::QrPayload;

/// Generate a ZATCA UBL 2.1 Invoice document from an invoice and its items.
///
/// Element order is fixed; identical input yields byte-identical output,
/// which the fingerprint depends on.
pub fn to_ubl_xml(invoice: &Invoice) -> XmlResult {
    ensure_required_fields(invoice)?;

    let currency = invoice.currency_code.as_str();
    let qr = QrPayload::for_invoice(invoice).encode()?;
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "Invoice",
        &[
            ("xmlns", ubl_ns::INVOICE),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
        ],
    )?;

    // BT-24 / BT-23
    w.text_element("cbc:CustomizationID", ZATCA_CUSTOMIZATION_ID)?;
    w.text_element("cbc:ProfileID", ZATCA_PROFILE_ID)?;
    // BT-1: Invoice number
    w.text_element("cbc:ID", &invoice.invoice_number)?;
    // KSA-1: Invoice UUID
    w.text_element("cbc:UUID", &invoice.id.to_string())?;
    // BT-2 / KSA-25: Issue date and time (UTC)
    w.text_element(
        "cbc:IssueDate",
        &invoice.issued_at.format("%Y-%m-%d").to_string(),
    )?;
    w.text_element(
        "cbc:IssueTime",
        &invoice.issued_at.format("%H:%M:%S").to_string(),
    )?;
    // BT-3 / KSA-2
    w.text_element_with_attrs(
        "cbc:InvoiceTypeCode",
        INVOICE_TYPE_CODE,
        &[("name", SIMPLIFIED_TRANSACTION_CODE)],
    )?;
    // BT-5 / BT-6
    w.text_element("cbc:DocumentCurrencyCode", currency)?;
    w.text_element("cbc:TaxCurrencyCode", currency)?;

    // KSA-14: QR code
    w.start_element("cac:AdditionalDocumentReference")?;
    w.text_element("cbc:ID", "QR")?;
    w.start_element("cac:Attachment")?;
    w.text_element_with_attrs(
        "cbc:EmbeddedDocumentBinaryObject",
        &qr,
        &[("mimeCode", "text/plain")],
    )?;
    w.end_element("cac:Attachment")?;
    w.end_element("cac:AdditionalDocumentReference")?;

    // BG-4: Seller
    write_supplier(&mut w, &invoice.seller)?;
    // BG-7: Buyer
    write_customer(&mut w, &invoice.buyer)?;

    // BG-23: Tax total
    w.start_element("cac:TaxTotal")?;
    w.amount_element("cbc:TaxAmount", invoice.taxes, currency)?;
    write_tax_subtotal(&mut w, invoice.total, invoice.taxes, invoice.tax_rate, currency)?;
    w.end_element("cac:TaxTotal")?;

    // BG-22: Legal monetary total
    let with_vat = invoice.total_with_vat();
    w.start_element("cac:LegalMonetaryTotal")?;
    w.amount_element("cbc:LineExtensionAmount", invoice.line_total()?, currency)?;
    w.amount_element("cbc:TaxExclusiveAmount", invoice.total, currency)?;
    w.amount_element("cbc:TaxInclusiveAmount", with_vat, currency)?;
    w.amount_element("cbc:PayableAmount", with_vat, currency)?;
    w.end_element("cac:LegalMonetaryTotal")?;

    // BG-25: Invoice lines
    for (idx, item) in invoice.items.iter().enumerate() {
        write_line(&mut w, idx + 1, item, invoice.tax_rate, currency)?;
    }

    w.end_element("Invoice")?;

    w.into_string()
}

fn write_supplier(w: &mut XmlWriter, seller: &Seller) -> Result<(), ZatcaError> {
    w.start_element("cac:AccountingSupplierParty")?;
    w.start_element("cac:Party")?;

    w.start_element("cac:PartyIdentification")?;
    w.text_element_with_attrs("cbc:ID", &seller.vat_number, &[("schemeID", "CRN")])?;
    w.end_element("cac:PartyIdentification")?;

    w.start_element("cac:PartyName")?;
    w.text_element("cbc:Name", &seller.name)?;
    w.end_element("cac:PartyName")?;

    // BG-5: Postal address
    w.start_element("cac:PostalAddress")?;
    w.text_element("cbc:StreetName", &seller.address)?;
    w.start_element("cac:Country")?;
    w.text_element("cbc:IdentificationCode", "SA")?;
    w.end_element("cac:Country")?;
    w.end_element("cac:PostalAddress")?;

    // BT-31: VAT identifier
    w.start_element("cac:PartyTaxScheme")?;
    w.text_element("cbc:CompanyID", &seller.vat_number)?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", "VAT")?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:PartyTaxScheme")?;

    // BT-27: Legal name
    w.start_element("cac:PartyLegalEntity")?;
    w.text_element("cbc:RegistrationName", &seller.name)?;
    w.end_element("cac:PartyLegalEntity")?;

    w.end_element("cac:Party")?;
    w.end_element("cac:AccountingSupplierParty")?;
    Ok(())
}

fn write_customer(w: &mut XmlWriter, buyer: &Buyer) -> Result<(), ZatcaError> {
    w.start_element("cac:AccountingCustomerParty")?;
    w.start_element("cac:Party")?;
    if !buyer.id.trim().is_empty() {
        w.start_element("cac:PartyIdentification")?;
        w.text_element("cbc:ID", &buyer.id)?;
        w.end_element("cac:PartyIdentification")?;
    }
    w.start_element("cac:PartyName")?;
    w.text_element("cbc:Name", &buyer.name)?;
    w.end_element("cac:PartyName")?;
    w.end_element("cac:Party")?;
    w.end_element("cac:AccountingCustomerParty")?;
    Ok(())
}

fn write_tax_subtotal(
    w: &mut XmlWriter,
    taxable: Decimal,
    tax: Decimal,
    rate: Decimal,
    currency: &str,
) -> Result<(), ZatcaError> {
    w.start_element("cac:TaxSubtotal")?;
    w.amount_element("cbc:TaxableAmount", taxable, currency)?;
    w.amount_element("cbc:TaxAmount", tax, currency)?;
    w.start_element("cac:TaxCategory")?;
    w.text_element("cbc:ID", "S")?;
    w.text_element("cbc:Percent", &format_percent(rate))?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", "VAT")?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:TaxCategory")?;
    w.end_element("cac:TaxSubtotal")?;
    Ok(())
}

fn write_line(
    w: &mut XmlWriter,
    line_no: usize,
    item: &InvoiceItem,
    rate: Decimal,
    currency: &str,
) -> Result<(), ZatcaError> {
    let line_amount = item.line_amount()?;

    w.start_element("cac:InvoiceLine")?;
    // BT-126: Line ID
    w.text_element("cbc:ID", &line_no.to_string())?;
    // BT-129/130: Quantity with unit
    w.quantity_element("cbc:InvoicedQuantity", item.quantity, UNIT_CODE)?;
    // BT-131: Line net amount
    w.amount_element("cbc:LineExtensionAmount", line_amount, currency)?;

    // BT-153: Item name
    w.start_element("cac:Item")?;
    w.text_element("cbc:Name", &item.name)?;
    w.end_element("cac:Item")?;

    // BT-146: Unit price
    w.start_element("cac:Price")?;
    w.amount_element("cbc:PriceAmount", item.price, currency)?;
    w.end_element("cac:Price")?;

    // Line tax breakdown
    w.start_element("cac:TaxTotal")?;
    w.amount_element("cbc:TaxAmount", item.tax, currency)?;
    write_tax_subtotal(w, line_amount, item.tax, rate, currency)?;
    w.end_element("cac:TaxTotal")?;

    w.end_element("cac:InvoiceLine")?;
    Ok(())
}

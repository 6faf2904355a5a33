//! Legacy free-text category labels and the canonical label each folds into.
//!
//! Keys are already normalized (lowercase, trimmed). Misspelled keys match
//! values that occur verbatim in imported data.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

pub static LEGACY_CATEGORY_MAP: &[(&str, &str)] = &[
    // Professional Services
    ("accounting", "Professional Services"),
    ("accounting & tax services", "Professional Services"),
    ("business business consulting", "Professional Services"),
    ("business resources", "Professional Services"),
    ("business services", "Professional Services"),
    ("busienss services/consulting", "Professional Services"),
    ("business solutions", "Professional Services"),
    ("consulting", "Professional Services"),
    ("professional services", "Professional Services"),
    ("human resources", "Professional Services"),
    ("marketing", "Professional Services"),
    ("managment", "Professional Services"),
    ("promotion", "Professional Services"),
    ("promotions", "Professional Services"),
    ("organizational development", "Professional Services"),
    ("advocacy", "Professional Services"),
    ("conflict resolution services", "Professional Services"),
    ("fingerprinting", "Professional Services"),
    ("notary public", "Professional Services"),

    // Construction & Contractors
    ("construction", "Construction & Contractors"),
    ("construction contractors", "Construction & Contractors"),
    ("construction management", "Construction & Contractors"),
    ("construction services", "Construction & Contractors"),
    ("contractor", "Construction & Contractors"),
    ("contractors", "Construction & Contractors"),
    ("general contractors", "Construction & Contractors"),
    ("carpentry contractors", "Construction & Contractors"),
    ("carpteting contractors", "Construction & Contractors"),
    ("electrical", "Construction & Contractors"),
    ("electricals", "Construction & Contractors"),
    ("plumbing", "Construction & Contractors"),
    ("plumbing & hvac contractors", "Construction & Contractors"),
    ("roofing", "Construction & Contractors"),
    ("painting", "Construction & Contractors"),
    ("painting contractors", "Construction & Contractors"),
    ("paving", "Construction & Contractors"),
    ("paving contractors", "Construction & Contractors"),
    ("asphalt paving", "Construction & Contractors"),
    ("demolition", "Construction & Contractors"),
    ("excavation", "Construction & Contractors"),
    ("flooring", "Construction & Contractors"),
    ("floor installation", "Construction & Contractors"),
    ("metalwork contractors", "Construction & Contractors"),
    ("fencing", "Construction & Contractors"),
    ("fences", "Construction & Contractors"),
    ("welding", "Construction & Contractors"),
    ("water construction", "Construction & Contractors"),
    ("air conditioning", "Construction & Contractors"),
    ("elevator service", "Construction & Contractors"),
    ("fire protection", "Construction & Contractors"),
    ("installations", "Construction & Contractors"),
    ("gate operators", "Construction & Contractors"),

    // Healthcare & Medical
    ("pediatrics", "Healthcare & Medical"),
    ("dental", "Healthcare & Medical"),
    ("dentist", "Healthcare & Medical"),
    ("dermatology", "Healthcare & Medical"),
    ("gynecology", "Healthcare & Medical"),
    ("health", "Healthcare & Medical"),
    ("health services", "Healthcare & Medical"),
    ("healthcare", "Healthcare & Medical"),
    ("healthcare services", "Healthcare & Medical"),
    ("medical", "Healthcare & Medical"),
    ("physicians", "Healthcare & Medical"),
    ("ophthalmology", "Healthcare & Medical"),
    ("opticians", "Healthcare & Medical"),
    ("podiatry", "Healthcare & Medical"),
    ("pharmacy/clinic", "Healthcare & Medical"),
    ("mental health & counseling services", "Healthcare & Medical"),
    ("therapy", "Healthcare & Medical"),
    ("rehabilitation", "Healthcare & Medical"),
    ("counseling", "Healthcare & Medical"),
    ("disability services", "Healthcare & Medical"),

    // Automotive Services
    ("auto repair & services", "Automotive Services"),
    ("automotive", "Automotive Services"),
    ("mechanic", "Automotive Services"),
    ("motorcycles", "Automotive Services"),

    // Transportation Services
    ("transport", "Transportation Services"),
    ("transport services", "Transportation Services"),
    ("transportation", "Transportation Services"),
    ("transportation services", "Transportation Services"),
    ("bus services", "Transportation Services"),
    ("courier", "Transportation Services"),
    ("movers", "Transportation Services"),
    ("heavy hauling", "Transportation Services"),
    ("trucking", "Transportation Services"),
    ("towing", "Transportation Services"),
    ("travel", "Transportation Services"),

    // Home & Property Services
    ("cleaning services", "Home & Property Services"),
    ("janitorial services", "Home & Property Services"),
    ("home improvement", "Home & Property Services"),
    ("home remodelling", "Home & Property Services"),
    ("home services", "Home & Property Services"),
    ("appliance service", "Home & Property Services"),
    ("carpet cleaning", "Home & Property Services"),
    ("carpet sales", "Home & Property Services"),
    ("carpet sales & installation", "Home & Property Services"),
    ("draperies & windows", "Home & Property Services"),
    ("property cleanout services", "Home & Property Services"),
    ("pest control", "Home & Property Services"),
    ("landscaping", "Home & Property Services"),
    ("debris removal", "Home & Property Services"),
    ("dumpster service", "Home & Property Services"),
    ("waste management", "Home & Property Services"),
    ("recycling", "Home & Property Services"),
    ("window distribution", "Home & Property Services"),
    ("properties", "Home & Property Services"),

    // Beauty & Personal Care
    ("beauty academies & salons", "Beauty & Personal Care"),
    ("salons", "Beauty & Personal Care"),
    ("hair care", "Beauty & Personal Care"),
    ("barber shops", "Beauty & Personal Care"),
    ("esthetician", "Beauty & Personal Care"),
    ("spas", "Beauty & Personal Care"),

    // Food & Dining
    ("restaurant", "Food & Dining"),
    ("restaurants", "Food & Dining"),
    ("bakery", "Food & Dining"),
    ("cafe", "Food & Dining"),
    ("catering services", "Food & Dining"),
    ("food service", "Food & Dining"),
    ("beverages", "Food & Dining"),
    ("desserts", "Food & Dining"),
    ("gourmet products", "Food & Dining"),

    // Retail & Shopping
    ("boutiques", "Retail & Shopping"),
    ("retail & gift shops", "Retail & Shopping"),
    ("retail & specialty shops", "Retail & Shopping"),
    ("gift shops", "Retail & Shopping"),
    ("clothing & apparrel", "Retail & Shopping"),
    ("cltothing", "Retail & Shopping"),
    ("furniture", "Retail & Shopping"),
    ("home appliances", "Retail & Shopping"),
    ("hardware", "Retail & Shopping"),
    ("hats", "Retail & Shopping"),
    ("bridal", "Retail & Shopping"),
    ("equipments", "Retail & Shopping"),
    ("camping equipment", "Retail & Shopping"),
    ("facility supplies", "Retail & Shopping"),
    ("awards", "Retail & Shopping"),
    ("memorials", "Retail & Shopping"),

    // Technology Services
    ("technology", "Technology Services"),
    ("technology services", "Technology Services"),
    ("computer sales & services", "Technology Services"),
    ("computer services", "Technology Services"),
    ("cybersecurity", "Technology Services"),
    ("wireless services", "Technology Services"),
    ("drones services", "Technology Services"),

    // Financial Services
    ("finance", "Financial Services"),
    ("mortgages", "Financial Services"),
    ("banks", "Financial Services"),
    ("money transfer/western union", "Financial Services"),
    ("lottery", "Financial Services"),
    ("insurance", "Financial Services"),
    ("real estate", "Financial Services"),
    ("real estate agencies", "Financial Services"),
    ("realestate", "Financial Services"),

    // Education & Training
    ("school", "Education & Training"),
    ("college", "Education & Training"),
    ("learning center", "Education & Training"),
    ("driving schools", "Education & Training"),
    ("training", "Education & Training"),
    ("career & employment serviceds", "Education & Training"),
    ("scholarships", "Education & Training"),
    ("firearm training", "Education & Training"),
    ("driving", "Education & Training"),

    // Entertainment & Events
    ("entertainment", "Entertainment & Events"),
    ("events", "Entertainment & Events"),
    ("event venue", "Entertainment & Events"),
    ("banquet halls event rentals", "Entertainment & Events"),
    ("performing arts", "Entertainment & Events"),
    ("bars & lounges", "Entertainment & Events"),
    ("clubs", "Entertainment & Events"),
    ("museums", "Entertainment & Events"),
    ("fitness", "Entertainment & Events"),
    ("health club", "Entertainment & Events"),
    ("lift & health coaching", "Entertainment & Events"),

    // Community & Nonprofit
    ("nonprofit & civic organizations", "Community & Nonprofit"),
    ("nonprofit foundation", "Community & Nonprofit"),
    ("nonprofit organization", "Community & Nonprofit"),
    ("ngo", "Community & Nonprofit"),
    ("charitable organizations", "Community & Nonprofit"),
    ("charity", "Community & Nonprofit"),
    ("community center", "Community & Nonprofit"),
    ("community organizations", "Community & Nonprofit"),
    ("youth organization", "Community & Nonprofit"),
    ("association", "Community & Nonprofit"),
    ("union", "Community & Nonprofit"),
    ("civil rights organization", "Community & Nonprofit"),

    // Religious Organizations
    ("church", "Religious Organizations"),
    ("churches", "Religious Organizations"),

    // Media & Creative
    ("media", "Media & Creative"),
    ("media & production services", "Media & Creative"),
    ("photography", "Media & Creative"),
    ("radio station", "Media & Creative"),
    ("radio stations", "Media & Creative"),
    ("television", "Media & Creative"),
    ("publishing services", "Media & Creative"),
    ("magazines", "Media & Creative"),
    ("art", "Media & Creative"),
    ("art dealers", "Media & Creative"),
    ("design", "Media & Creative"),
    ("decorating", "Media & Creative"),
    ("decorators", "Media & Creative"),
    ("glass designers", "Media & Creative"),
    ("embroidery", "Media & Creative"),
    ("tailoring", "Media & Creative"),
    ("signs", "Media & Creative"),
    ("audiovisual", "Media & Creative"),

    // Childcare & Family Services
    ("daycare", "Childcare & Family Services"),
    ("daycare centers", "Childcare & Family Services"),
    ("family services", "Childcare & Family Services"),
    ("housing", "Childcare & Family Services"),
    ("housing assistance", "Childcare & Family Services"),
    ("assisted living", "Childcare & Family Services"),

    // Legal Services
    ("law office", "Legal Services"),
    ("legal", "Legal Services"),
    ("legal services", "Legal Services"),
    ("bail bond", "Legal Services"),
    ("bail bonds", "Legal Services"),

    // Employment Services
    ("employment agencies", "Employment Services"),
    ("employment services", "Employment Services"),
    ("staffing", "Employment Services"),

    // Security Services
    ("security", "Security Services"),
    ("firearms", "Security Services"),

    // Environmental Services
    ("environmental", "Environmental Services"),
    ("environmental engineeringconsulting", "Environmental Services"),
    ("environmental services", "Environmental Services"),
    ("environment", "Environmental Services"),

    // Engineering & Architecture
    ("engineering", "Engineering & Architecture"),
    ("architects", "Engineering & Architecture"),
    ("planning", "Engineering & Architecture"),

    // Pet Services
    ("pet services", "Pet Services"),

    // Funeral Services
    ("funeral services", "Funeral Services"),

    // Specialty Services
    ("florist", "Specialty Services"),
    ("dry cleaners", "Specialty Services"),
    ("lead inspection", "Specialty Services"),
    ("vendor", "Specialty Services"),

    // Government
    ("government", "Government"),
];

static LOOKUP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| LEGACY_CATEGORY_MAP.iter().copied().collect());

/// Lowercases and trims a label the way mapping keys are stored.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Canonical label for an already-normalized key.
pub fn canonical_for_key(key: &str) -> Option<&'static str> {
    LOOKUP.get(key).copied()
}

pub fn canonical_for(label: &str) -> Option<&'static str> {
    canonical_for_key(&normalize_label(label))
}

/// True when `label` is exactly one of the canonical labels.
pub fn is_canonical(label: &str) -> bool {
    LEGACY_CATEGORY_MAP
        .iter()
        .any(|(_, canonical)| *canonical == label)
}

/// Every canonical label the mapping can produce, sorted.
pub fn canonical_categories() -> Vec<&'static str> {
    LEGACY_CATEGORY_MAP
        .iter()
        .map(|(_, canonical)| *canonical)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_normalized_and_unique() {
        let mut seen = BTreeSet::new();
        for (key, _) in LEGACY_CATEGORY_MAP {
            assert_eq!(*key, normalize_label(key), "key '{key}' is not normalized");
            assert!(seen.insert(*key), "duplicate key '{key}'");
        }
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        assert_eq!(canonical_for("  ACCOUNTING & TAX SERVICES "), Some("Professional Services"));
        assert_eq!(canonical_for("Bail Bonds"), Some("Legal Services"));
        assert_eq!(canonical_for("florist"), Some("Specialty Services"));
        assert_eq!(canonical_for("underwater basket weaving"), None);
    }

    #[test]
    fn canonical_set_is_sorted_and_deduplicated() {
        let canonical = canonical_categories();
        let mut sorted = canonical.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(canonical, sorted);
        assert_eq!(canonical.len(), 26);
        assert!(canonical.contains(&"Government"));
        assert!(canonical.contains(&"Retail & Shopping"));
    }

    #[test]
    fn canonical_labels_map_to_themselves_when_listed() {
        for canonical in canonical_categories() {
            if let Some(target) = canonical_for(canonical) {
                assert_eq!(target, canonical);
            }
        }
    }
}

use xml_schemer::catalog::{CatalogLookup, effective_system_id};
use xml_schemer::{CatalogRequest, CatalogResolver, ResourceType, XmlCatalog};

mod common;
use common::TestFixtures;

const PARTY_NS: &str = "http://www.example.org/party";

fn include_request<'a>(system_id: &'a str, base_uri: &'a str) -> CatalogRequest<'a> {
    CatalogRequest {
        resource_type: ResourceType::Schema,
        namespace_uri: PARTY_NS,
        public_id: None,
        system_id,
        base_uri: Some(base_uri),
    }
}

#[test]
fn test_local_include_resolves_through_namespace() {
    let fixtures = TestFixtures::new();
    let catalog = XmlCatalog::load(&fixtures.catalog()).unwrap();
    let resolver = CatalogResolver::new(&catalog);
    let base = fixtures.party_schema().to_string_lossy().into_owned();

    let resolved = resolver
        .resolve(&include_request("party-types.xsd", &base))
        .unwrap();

    assert!(resolved.uri.ends_with("schemas/shared/party-types.xsd"));
}

#[test]
fn test_same_entry_serves_includes_from_any_base() {
    let fixtures = TestFixtures::new();
    let catalog = XmlCatalog::load(&fixtures.catalog()).unwrap();
    let resolver = CatalogResolver::new(&catalog);

    let from_party = resolver.resolve(&include_request("party-types.xsd", "/a/party.xsd"));
    let from_elsewhere = resolver.resolve(&include_request("party-types.xsd", "/somewhere/else/x.xsd"));

    assert!(from_party.is_some());
    assert_eq!(from_party, from_elsewhere);
}

#[test]
fn test_raw_relative_path_is_not_looked_up() {
    let fixtures = TestFixtures::new();
    let catalog = XmlCatalog::load(&fixtures.catalog()).unwrap();

    // The rewritten id is what reaches the catalog
    let request = include_request("party-types.xsd", "/a/party.xsd");
    assert_eq!(
        effective_system_id(&request),
        "http://www.example.org/party/party-types.xsd"
    );
    assert!(catalog.match_system("party-types.xsd").is_none());
}

#[test]
fn test_unknown_include_is_unresolved() {
    let fixtures = TestFixtures::new();
    let catalog = XmlCatalog::load(&fixtures.catalog()).unwrap();
    let resolver = CatalogResolver::new(&catalog);

    assert!(
        resolver
            .resolve(&include_request("unknown.xsd", "/a/party.xsd"))
            .is_none()
    );
}

#[test]
fn test_public_identifier_match() {
    let fixtures = TestFixtures::new();
    let catalog = XmlCatalog::load(&fixtures.catalog()).unwrap();
    let resolver = CatalogResolver::new(&catalog);

    let resolved = resolver
        .resolve(&CatalogRequest {
            resource_type: ResourceType::Schema,
            namespace_uri: PARTY_NS,
            public_id: Some("-//EXAMPLE//Party Schema//EN"),
            system_id: "party.xsd",
            base_uri: None,
        })
        .unwrap();

    assert!(resolved.uri.ends_with("schemas/party/party.xsd"));
}

#[test]
fn test_uri_lookup_for_transform_resources() {
    let fixtures = TestFixtures::new();
    let catalog = XmlCatalog::load(&fixtures.catalog()).unwrap();
    let resolver = CatalogResolver::new(&catalog);

    let resolved = resolver
        .resolve_uri("http://www.example.org/codes/roleCodes.xml", None)
        .unwrap();

    assert!(resolved.uri.ends_with("codelists/roleCodes.xml"));
    assert!(resolver.resolve_uri("http://www.example.org/other.xml", None).is_none());
}
